//! Differentiable stream-balance core for techno-economic simulation.
//!
//! Aggregates production and demand of named streams across contributing
//! technologies, computes bounded smooth availability ratios usable by a
//! gradient-based optimizer, and expands reduced investment-profile poles
//! into dense annual curves via spline evaluation.

/// Stream aggregation, ratios, and the balance orchestrator.
pub mod balance;
pub mod config;
/// Engine-facing adapter contract (flat variable maps, jacobian blocks).
pub mod discipline;
pub mod error;
pub mod io;
/// Investment-profile builder (poles to dense curve).
pub mod profile;
pub mod reporting;
pub mod series;
/// Smoothed division and objective utilities.
pub mod smoothing;
pub mod units;

// Re-export the main types for convenience
pub use balance::{BalanceInput, BalanceResult, Ratio, Stream, StreamBalance, balance};
pub use config::{BalanceConfig, DemandDetailMode};
pub use error::BalanceError;
pub use profile::{InvestmentProfile, build, combine};
pub use series::{TimeSeries, YearSpan};
pub use units::Unit;

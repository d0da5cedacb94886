//! Stream balance: aggregation, availability ratios, and orchestration.

/// Per-contributor aggregation into stream totals.
pub mod aggregator;
/// Full-economy balance composition and penalty objective.
pub mod orchestrator;
/// Bounded, smooth availability ratio.
pub mod ratio;
pub mod stream;

// Re-export the main types for convenience
pub use aggregator::aggregate;
pub use orchestrator::{BalanceInput, BalanceResult, DemandDetail, StreamBalance, balance};
pub use ratio::{Ratio, availability_ratio};
pub use stream::Stream;

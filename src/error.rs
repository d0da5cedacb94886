//! Crate-wide error taxonomy.
//!
//! All failures here are structural contract violations surfaced to the
//! immediate caller; a balance evaluation either fully succeeds for every
//! stream or stops on the first inconsistency. Ratio clamping and division
//! smoothing are deliberate approximations, not errors.

use std::fmt;

use thiserror::Error;

/// Errors raised by the stream-balance core.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// Two series expected on the same year grid disagree.
    #[error("shape mismatch for {what}: expected years {expected}, got {actual}")]
    ShapeMismatch {
        /// What was being aligned (stream, contributor, or variable name).
        what: String,
        /// Expected year span.
        expected: String,
        /// Actual year span.
        actual: String,
    },

    /// An investment profile was asked for fewer samples than it has poles.
    #[error("invalid profile length: target length {target_length} < {pole_count} poles")]
    InvalidProfileLength {
        /// Number of control points supplied.
        pole_count: usize,
        /// Requested dense curve length.
        target_length: usize,
    },

    /// A profile was built from an empty pole set.
    #[error("an investment profile needs at least one pole")]
    EmptyPoles,

    /// `combine` was handed nothing to combine.
    #[error("nothing to combine: at least one weighted curve is required")]
    NothingToCombine,

    /// A stream id was referenced but not configured.
    #[error("unknown stream \"{0}\"")]
    UnknownStream(String),

    /// A unit conversion crosses physical dimensions.
    #[error("unit mismatch: cannot convert {from} ({from_dim}) to {to} ({to_dim})")]
    UnitMismatch {
        /// Source unit symbol.
        from: String,
        /// Source dimension.
        from_dim: String,
        /// Target unit symbol.
        to: String,
        /// Target dimension.
        to_dim: String,
    },

    /// A discipline input was absent from the variable map.
    #[error("missing variable \"{0}\"")]
    MissingVariable(String),

    /// A discipline input had the wrong kind of value.
    #[error("variable \"{name}\": expected {expected}, got {actual}")]
    WrongValueKind {
        /// Fully-qualified variable name.
        name: String,
        /// Expected value kind.
        expected: &'static str,
        /// Kind actually found.
        actual: &'static str,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(ConfigError),
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"stream[1].conversion_factor"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {} — {}", self.field, self.message)
    }
}

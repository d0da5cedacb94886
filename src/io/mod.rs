//! Table export utilities.

pub mod export;

//! # faultline-types::errors
//!
//! Error types shared by the vector containers. Structural misuse (shape
//! mismatch between vectors of different circuits) and parse failures are
//! surfaced to the caller; value conflicts during merge are ordinary,
//! recoverable outcomes.

use thiserror::Error;

/// Errors raised by `BitVector` / `TestVector` operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VectorError {
    #[error("vector length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },
    #[error("merge conflict: definite bits disagree")]
    Conflict,
    #[error("invalid character {found:?} in {kind} string")]
    Parse { kind: &'static str, found: char },
}

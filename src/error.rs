//! Error types for the IRT kernel.

use thiserror::Error;

/// Crate-wide result alias.
pub type IrtResult<T> = Result<T, IrtError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IrtError {
    /// Discrimination must be finite and strictly positive.
    #[error("discrimination (alpha) must be finite and > 0, got {alpha}")]
    InvalidDiscrimination { alpha: f64 },

    /// Guessing floor must lie in [0, 1).
    #[error("guessing parameter (c) must lie in [0, 1), got {c}")]
    InvalidGuessing { c: f64 },

    #[error("{name} must be finite, got {value}")]
    NonFiniteInput { name: &'static str, value: f64 },

    #[error("{what}: expected length {expected}, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    /// Estimation options failed validation.
    #[error("invalid option {name} = {value}: {reason}")]
    InvalidOptions {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

pub(crate) fn ensure_finite(name: &'static str, value: f64) -> IrtResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(IrtError::NonFiniteInput { name, value })
    }
}

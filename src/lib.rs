//! Numerically stable kernel for dichotomous Item Response Theory models.
//!
//! This crate provides:
//! - The 2PL response probability with an optional guessing floor (3PL)
//! - Log-likelihoods for hard or fractional (expected-count) responses
//! - Closed-form gradients w.r.t. item parameters (beta, alpha)
//! - Ability gradients and Hessians for Newton-Raphson scoring
//! - Log-sum-exp aggregation that does not underflow
//! - Batch likelihoods over response matrices and ability grids
//! - Seeded response simulation
//!
//! Every function is pure; batch helpers parallelize over persons with rayon.
//! Python bindings are available behind the `python` feature.

pub mod utils;

pub mod error;
pub mod likelihood;
pub mod model;
pub mod scoring;
pub mod simulation;

#[cfg(feature = "python")]
pub mod python;

pub use error::{IrtError, IrtResult};
pub use model::{
    irt_fnc, log_likelihood_2pl, log_likelihood_2pl_gradient, log_likelihood_factor_gradient,
    log_likelihood_factor_hessian, ItemParams, Response,
};
pub use scoring::{AbilityEstimate, NewtonOptions};

/// Stable `log(sum(exp(x)))` over log-probabilities.
pub fn logsum(log_prob: &[f64]) -> f64 {
    utils::logsumexp(log_prob)
}

/// Python module for irt_kernel
#[cfg(feature = "python")]
#[pyo3::pymodule]
fn irt_kernel(m: &pyo3::Bound<'_, pyo3::types::PyModule>) -> pyo3::PyResult<()> {
    python::register(m)
}

//! Newton-Raphson ability estimation on top of the kernel derivatives.

use log::{debug, warn};
use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::error::{IrtError, IrtResult};
use crate::model::{ItemParams, Response};
use crate::utils::clip;

/// Tuning for [`estimate_ability`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonOptions {
    pub max_iter: usize,
    /// Stop once |theta_new - theta| falls below this.
    pub tol: f64,
    pub theta_min: f64,
    pub theta_max: f64,
    /// Largest absolute change of theta in a single step.
    pub max_step: f64,
}

impl Default for NewtonOptions {
    fn default() -> Self {
        Self {
            max_iter: 50,
            tol: 1e-6,
            theta_min: -6.0,
            theta_max: 6.0,
            max_step: 1.0,
        }
    }
}

impl NewtonOptions {
    pub fn validate(&self) -> IrtResult<()> {
        if self.max_iter == 0 {
            return Err(IrtError::InvalidOptions {
                name: "max_iter",
                value: 0.0,
                reason: "at least one iteration is required",
            });
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(IrtError::InvalidOptions {
                name: "tol",
                value: self.tol,
                reason: "must be positive and finite",
            });
        }
        if !(self.max_step.is_finite() && self.max_step > 0.0) {
            return Err(IrtError::InvalidOptions {
                name: "max_step",
                value: self.max_step,
                reason: "must be positive and finite",
            });
        }
        if !(self.theta_min.is_finite() && self.theta_max.is_finite())
            || self.theta_min >= self.theta_max
        {
            return Err(IrtError::InvalidOptions {
                name: "theta_max",
                value: self.theta_max,
                reason: "theta bounds must be finite with theta_min < theta_max",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityEstimate {
    pub theta: f64,
    /// 1 / sqrt(-hessian) at the estimate, infinite without curvature.
    pub se: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// One Newton-Raphson update `theta - gradient / hessian`.
///
/// The step is capped at `max_step`. When the curvature is not negative
/// the Newton direction is not an ascent direction, so a capped step along
/// the gradient is taken instead.
#[inline]
pub fn newton_step(theta: f64, gradient: f64, hessian: f64, max_step: f64) -> f64 {
    let step = if hessian < 0.0 {
        -gradient / hessian
    } else if gradient == 0.0 {
        0.0
    } else {
        gradient.signum() * max_step
    };
    theta + clip(step, -max_step, max_step)
}

fn derivatives(observations: &[(Response, &ItemParams)], theta: f64) -> (f64, f64) {
    observations
        .iter()
        .fold((0.0, 0.0), |(g, h), (response, item)| {
            (
                g + item.ability_gradient(*response, theta),
                h + item.ability_hessian(*response, theta),
            )
        })
}

/// Maximum-likelihood ability for weighted responses to `items`.
pub fn estimate_ability_weighted(
    responses: &[Response],
    items: &[ItemParams],
    options: &NewtonOptions,
) -> IrtResult<AbilityEstimate> {
    options.validate()?;
    if responses.len() != items.len() {
        return Err(IrtError::DimensionMismatch {
            what: "responses",
            expected: items.len(),
            found: responses.len(),
        });
    }
    let observations: Vec<(Response, &ItemParams)> =
        responses.iter().copied().zip(items).collect();
    Ok(newton_raphson(&observations, options))
}

/// Maximum-likelihood ability for one person's coded responses
/// (1 correct, 0 incorrect, negative missing).
pub fn estimate_ability(
    responses: ArrayView1<i32>,
    items: &[ItemParams],
    options: &NewtonOptions,
) -> IrtResult<AbilityEstimate> {
    options.validate()?;
    if responses.len() != items.len() {
        return Err(IrtError::DimensionMismatch {
            what: "responses",
            expected: items.len(),
            found: responses.len(),
        });
    }
    Ok(newton_raphson(&coded_observations(responses, items), options))
}

/// Ability estimates for every row of a coded response matrix.
pub fn estimate_abilities(
    responses: ArrayView2<i32>,
    items: &[ItemParams],
    options: &NewtonOptions,
) -> IrtResult<Vec<AbilityEstimate>> {
    options.validate()?;
    if responses.ncols() != items.len() {
        return Err(IrtError::DimensionMismatch {
            what: "item parameters",
            expected: responses.ncols(),
            found: items.len(),
        });
    }

    let estimates = (0..responses.nrows())
        .into_par_iter()
        .map(|i| newton_raphson(&coded_observations(responses.row(i), items), options))
        .collect();
    Ok(estimates)
}

fn coded_observations<'a>(
    responses: ArrayView1<i32>,
    items: &'a [ItemParams],
) -> Vec<(Response, &'a ItemParams)> {
    responses
        .iter()
        .zip(items)
        .filter_map(|(&code, item)| Response::from_code(code).map(|r| (r, item)))
        .collect()
}

fn newton_raphson(
    observations: &[(Response, &ItemParams)],
    options: &NewtonOptions,
) -> AbilityEstimate {
    if observations.is_empty() {
        return AbilityEstimate {
            theta: 0.0,
            se: f64::INFINITY,
            iterations: 0,
            converged: false,
        };
    }

    let mut theta = clip(0.0, options.theta_min, options.theta_max);
    let mut converged = false;
    let mut iterations = 0;

    for iter in 0..options.max_iter {
        iterations = iter + 1;
        let (g, h) = derivatives(observations, theta);
        if h >= 0.0 {
            debug!("non-negative curvature {h:.3e} at theta = {theta:.4}, taking gradient step");
        }
        let next = clip(
            newton_step(theta, g, h, options.max_step),
            options.theta_min,
            options.theta_max,
        );
        let delta = next - theta;
        theta = next;
        if delta.abs() < options.tol {
            converged = true;
            break;
        }
    }

    let (g, h) = derivatives(observations, theta);
    let pinned = (theta <= options.theta_min && g < 0.0) || (theta >= options.theta_max && g > 0.0);
    if pinned {
        warn!("ability estimate pinned at bound theta = {theta} (gradient {g:.3e})");
        converged = false;
    }
    if h >= 0.0 {
        warn!("no negative curvature at theta = {theta} (hessian {h:.3e}), not a maximum");
        converged = false;
    }
    debug!("newton-raphson finished after {iterations} iterations: theta = {theta:.6}, converged = {converged}");

    AbilityEstimate {
        theta,
        se: if h < 0.0 { 1.0 / (-h).sqrt() } else { f64::INFINITY },
        iterations,
        converged,
    }
}

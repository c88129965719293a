//! Python bindings for the kernel, enabled with the `python` feature.

use ndarray::Array1;
use numpy::{PyArray1, PyArray2, PyReadonlyArray1, PyReadonlyArray2, ToPyArray};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::error::{IrtError, IrtResult};
use crate::likelihood;
use crate::model::{self, ItemParams};
use crate::scoring::{self, NewtonOptions};
use crate::simulation;
use crate::utils::logsumexp;

impl From<IrtError> for PyErr {
    fn from(err: IrtError) -> Self {
        PyValueError::new_err(err.to_string())
    }
}

fn item_bank(
    discrimination: &[f64],
    difficulty: &[f64],
    guessing: Option<&[f64]>,
) -> IrtResult<Vec<ItemParams>> {
    if difficulty.len() != discrimination.len() {
        return Err(IrtError::DimensionMismatch {
            what: "difficulty",
            expected: discrimination.len(),
            found: difficulty.len(),
        });
    }
    if let Some(g) = guessing {
        if g.len() != discrimination.len() {
            return Err(IrtError::DimensionMismatch {
                what: "guessing",
                expected: discrimination.len(),
                found: g.len(),
            });
        }
    }
    discrimination
        .iter()
        .zip(difficulty)
        .enumerate()
        .map(|(j, (&a, &b))| ItemParams::new(a, b, guessing.map_or(0.0, |g| g[j])))
        .collect()
}

#[pyfunction]
#[pyo3(signature = (theta, beta, alpha=1.0, c=0.0))]
pub fn irt_fnc(theta: f64, beta: f64, alpha: f64, c: f64) -> PyResult<f64> {
    Ok(model::irt_fnc(theta, beta, alpha, c)?)
}

#[pyfunction]
#[pyo3(name = "log_likelihood_2PL", signature = (y1, y0, theta, alpha, beta, c=0.0))]
pub fn log_likelihood_2pl(y1: f64, y0: f64, theta: f64, alpha: f64, beta: f64, c: f64) -> PyResult<f64> {
    Ok(model::log_likelihood_2pl(y1, y0, theta, alpha, beta, c)?)
}

/// Returns (d/d beta, d/d alpha).
#[pyfunction]
#[pyo3(name = "log_likelihood_2PL_gradient", signature = (y1, y0, theta, alpha, beta, c=0.0))]
pub fn log_likelihood_2pl_gradient(
    y1: f64,
    y0: f64,
    theta: f64,
    alpha: f64,
    beta: f64,
    c: f64,
) -> PyResult<(f64, f64)> {
    Ok(model::log_likelihood_2pl_gradient(y1, y0, theta, alpha, beta, c)?)
}

#[pyfunction]
#[pyo3(signature = (y1, y0, theta, alpha, beta, c=0.0))]
pub fn log_likelihood_factor_gradient(
    y1: f64,
    y0: f64,
    theta: f64,
    alpha: f64,
    beta: f64,
    c: f64,
) -> PyResult<f64> {
    Ok(model::log_likelihood_factor_gradient(y1, y0, theta, alpha, beta, c)?)
}

#[pyfunction]
#[pyo3(signature = (y1, y0, theta, alpha, beta, c=0.0))]
pub fn log_likelihood_factor_hessian(
    y1: f64,
    y0: f64,
    theta: f64,
    alpha: f64,
    beta: f64,
    c: f64,
) -> PyResult<f64> {
    Ok(model::log_likelihood_factor_hessian(y1, y0, theta, alpha, beta, c)?)
}

#[pyfunction]
pub fn logsum(log_prob: PyReadonlyArray1<f64>) -> f64 {
    let log_prob = log_prob.as_array();
    match log_prob.as_slice() {
        Some(values) => logsumexp(values),
        None => logsumexp(&log_prob.to_vec()),
    }
}

/// Log-likelihoods for all persons at all grid points.
#[pyfunction]
#[pyo3(signature = (responses, thetas, discrimination, difficulty, guessing=None))]
pub fn compute_log_likelihoods<'py>(
    py: Python<'py>,
    responses: PyReadonlyArray2<i32>,
    thetas: PyReadonlyArray1<f64>,
    discrimination: PyReadonlyArray1<f64>,
    difficulty: PyReadonlyArray1<f64>,
    guessing: Option<PyReadonlyArray1<f64>>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let responses = responses.as_array().to_owned();
    let thetas = thetas.as_array().to_vec();
    let guessing = guessing.map(|g| g.as_array().to_vec());
    let items = item_bank(
        &discrimination.as_array().to_vec(),
        &difficulty.as_array().to_vec(),
        guessing.as_deref(),
    )?;

    let result = py.detach(|| likelihood::compute_log_likelihoods(responses.view(), &thetas, &items))?;
    Ok(result.to_pyarray(py))
}

/// Newton-Raphson ability estimates; returns (theta, se, converged).
#[pyfunction]
#[pyo3(signature = (
    responses, discrimination, difficulty, guessing=None,
    max_iter=50, tol=1e-6, theta_min=-6.0, theta_max=6.0, max_step=1.0
))]
#[allow(clippy::too_many_arguments)]
pub fn estimate_abilities<'py>(
    py: Python<'py>,
    responses: PyReadonlyArray2<i32>,
    discrimination: PyReadonlyArray1<f64>,
    difficulty: PyReadonlyArray1<f64>,
    guessing: Option<PyReadonlyArray1<f64>>,
    max_iter: usize,
    tol: f64,
    theta_min: f64,
    theta_max: f64,
    max_step: f64,
) -> PyResult<(
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<f64>>,
    Bound<'py, PyArray1<bool>>,
)> {
    let responses = responses.as_array().to_owned();
    let guessing = guessing.map(|g| g.as_array().to_vec());
    let items = item_bank(
        &discrimination.as_array().to_vec(),
        &difficulty.as_array().to_vec(),
        guessing.as_deref(),
    )?;
    let options = NewtonOptions {
        max_iter,
        tol,
        theta_min,
        theta_max,
        max_step,
    };

    let estimates = py.detach(|| scoring::estimate_abilities(responses.view(), &items, &options))?;

    let theta: Array1<f64> = estimates.iter().map(|e| e.theta).collect();
    let se: Array1<f64> = estimates.iter().map(|e| e.se).collect();
    let converged: Array1<bool> = estimates.iter().map(|e| e.converged).collect();
    Ok((theta.to_pyarray(py), se.to_pyarray(py), converged.to_pyarray(py)))
}

#[pyfunction]
#[pyo3(signature = (theta, discrimination, difficulty, guessing=None, seed=0))]
pub fn simulate_responses<'py>(
    py: Python<'py>,
    theta: PyReadonlyArray1<f64>,
    discrimination: PyReadonlyArray1<f64>,
    difficulty: PyReadonlyArray1<f64>,
    guessing: Option<PyReadonlyArray1<f64>>,
    seed: u64,
) -> PyResult<Bound<'py, PyArray2<i32>>> {
    let thetas = theta.as_array().to_vec();
    let guessing = guessing.map(|g| g.as_array().to_vec());
    let items = item_bank(
        &discrimination.as_array().to_vec(),
        &difficulty.as_array().to_vec(),
        guessing.as_deref(),
    )?;

    let result = py.detach(|| simulation::simulate_responses(&thetas, &items, seed))?;
    Ok(result.to_pyarray(py))
}

/// Register kernel functions with the Python module
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(irt_fnc, m)?)?;
    m.add_function(wrap_pyfunction!(log_likelihood_2pl, m)?)?;
    m.add_function(wrap_pyfunction!(log_likelihood_2pl_gradient, m)?)?;
    m.add_function(wrap_pyfunction!(log_likelihood_factor_gradient, m)?)?;
    m.add_function(wrap_pyfunction!(log_likelihood_factor_hessian, m)?)?;
    m.add_function(wrap_pyfunction!(logsum, m)?)?;
    m.add_function(wrap_pyfunction!(compute_log_likelihoods, m)?)?;
    m.add_function(wrap_pyfunction!(estimate_abilities, m)?)?;
    m.add_function(wrap_pyfunction!(simulate_responses, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_facing_names() {
        Python::initialize();
        Python::attach(|py| {
            let m = PyModule::new(py, "irt_kernel").unwrap();
            register(&m).unwrap();
            assert!(m.getattr("log_likelihood_2PL_gradient").is_ok());
            assert!(m.getattr("log_likelihood_factor_hessian").is_ok());

            let ll: f64 = m
                .getattr("log_likelihood_2PL")
                .unwrap()
                .call1((1.0, 0.0, 0.0, 1.0, 0.0, 0.25))
                .unwrap()
                .extract()
                .unwrap();
            assert_eq!(ll, 0.625f64.ln());

            let err = m
                .getattr("irt_fnc")
                .unwrap()
                .call1((0.0, 0.0, -1.0))
                .unwrap_err();
            assert!(err.is_instance_of::<PyValueError>(py));
        });
    }
}

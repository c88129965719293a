//! Log-likelihood computation over response matrices and ability grids.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;

use crate::error::{IrtError, IrtResult};
use crate::model::{ItemParams, Response};
use crate::utils::logsumexp;

fn check_items(n_items: usize, items: &[ItemParams]) -> IrtResult<()> {
    if n_items != items.len() {
        return Err(IrtError::DimensionMismatch {
            what: "item parameters",
            expected: n_items,
            found: items.len(),
        });
    }
    Ok(())
}

/// Log-likelihood of one person's coded responses at `theta`.
///
/// Negative codes are treated as missing and skipped.
pub fn person_log_likelihood(
    responses: ArrayView1<i32>,
    theta: f64,
    items: &[ItemParams],
) -> IrtResult<f64> {
    check_items(responses.len(), items)?;
    Ok(person_log_likelihood_unchecked(responses, theta, items))
}

#[inline]
pub(crate) fn person_log_likelihood_unchecked(
    responses: ArrayView1<i32>,
    theta: f64,
    items: &[ItemParams],
) -> f64 {
    responses
        .iter()
        .zip(items)
        .filter_map(|(&code, item)| Response::from_code(code).map(|r| item.log_likelihood(r, theta)))
        .sum()
}

/// Compute log-likelihoods for all persons at all grid points.
///
/// Returns a `n_persons x n_points` matrix.
pub fn compute_log_likelihoods(
    responses: ArrayView2<i32>,
    thetas: &[f64],
    items: &[ItemParams],
) -> IrtResult<Array2<f64>> {
    check_items(responses.ncols(), items)?;

    let n_persons = responses.nrows();
    let n_points = thetas.len();

    let log_likes: Vec<Vec<f64>> = (0..n_persons)
        .into_par_iter()
        .map(|i| {
            let resp_row = responses.row(i);
            thetas
                .iter()
                .map(|&theta| person_log_likelihood_unchecked(resp_row, theta, items))
                .collect()
        })
        .collect();

    let mut result = Array2::zeros((n_persons, n_points));
    for (i, row) in log_likes.iter().enumerate() {
        for (q, &val) in row.iter().enumerate() {
            result[[i, q]] = val;
        }
    }
    Ok(result)
}

/// Evenly spaced ability grid on `[min, max]` with log weights of a
/// standard normal prior, normalized to sum to one.
pub fn theta_grid(n: usize, min: f64, max: f64) -> IrtResult<(Vec<f64>, Vec<f64>)> {
    if n < 2 {
        return Err(IrtError::InvalidOptions {
            name: "n_points",
            value: n as f64,
            reason: "grid needs at least two points",
        });
    }
    if !(min.is_finite() && max.is_finite() && min < max) {
        return Err(IrtError::InvalidOptions {
            name: "theta range",
            value: max - min,
            reason: "bounds must be finite with min < max",
        });
    }

    let step = (max - min) / (n - 1) as f64;
    let nodes: Vec<f64> = (0..n).map(|i| min + i as f64 * step).collect();
    let unnormalized: Vec<f64> = nodes.iter().map(|&x| -0.5 * x * x).collect();
    let log_norm = logsumexp(&unnormalized);
    let log_weights = unnormalized.iter().map(|&w| w - log_norm).collect();
    Ok((nodes, log_weights))
}

/// Per-person marginal log-likelihood `logsum_q(ll[i, q] + log_w[q])`
/// together with the total over persons.
pub fn marginal_log_likelihood(
    log_likes: ArrayView2<f64>,
    log_weights: &[f64],
) -> IrtResult<(Array1<f64>, f64)> {
    if log_likes.ncols() != log_weights.len() {
        return Err(IrtError::DimensionMismatch {
            what: "grid log weights",
            expected: log_likes.ncols(),
            found: log_weights.len(),
        });
    }

    let per_person: Vec<f64> = log_likes
        .outer_iter()
        .into_par_iter()
        .map(|row| {
            let joint: Vec<f64> = row.iter().zip(log_weights).map(|(ll, w)| ll + w).collect();
            logsumexp(&joint)
        })
        .collect();

    let total = per_person.iter().sum();
    Ok((Array1::from_vec(per_person), total))
}

/// Item-parameter gradient accumulated over a grid with expected counts.
///
/// `y1[q]` and `y0[q]` are the expected numbers of correct and incorrect
/// responses to `item` at `thetas[q]`. Returns `(d/d beta, d/d alpha)`.
pub fn expected_item_gradient(
    y1: &[f64],
    y0: &[f64],
    thetas: &[f64],
    item: &ItemParams,
) -> IrtResult<(f64, f64)> {
    for (what, len) in [("expected correct counts", y1.len()), ("expected incorrect counts", y0.len())] {
        if len != thetas.len() {
            return Err(IrtError::DimensionMismatch {
                what,
                expected: thetas.len(),
                found: len,
            });
        }
    }

    let mut gradient = (0.0, 0.0);
    for ((&r1, &r0), &theta) in y1.iter().zip(y0).zip(thetas) {
        let (d_beta, d_alpha) = item.item_gradient(Response::new(r1, r0)?, theta);
        gradient.0 += d_beta;
        gradient.1 += d_alpha;
    }
    Ok(gradient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn items() -> Vec<ItemParams> {
        vec![
            ItemParams::two_pl(1.0, -1.0).unwrap(),
            ItemParams::two_pl(1.5, 0.0).unwrap(),
            ItemParams::new(0.8, 1.0, 0.2).unwrap(),
        ]
    }

    #[test]
    fn test_person_log_likelihood_skips_missing() {
        let items = items();
        let full = array![1, 0, 1];
        let partial = array![1, -1, 1];
        let theta = 0.3;

        let expected_full: f64 = [
            items[0].log_likelihood(Response::correct(), theta),
            items[1].log_likelihood(Response::incorrect(), theta),
            items[2].log_likelihood(Response::correct(), theta),
        ]
        .iter()
        .sum();
        assert_abs_diff_eq!(
            person_log_likelihood(full.view(), theta, &items).unwrap(),
            expected_full,
            epsilon = 1e-12
        );

        let expected_partial = expected_full - items[1].log_likelihood(Response::incorrect(), theta);
        assert_abs_diff_eq!(
            person_log_likelihood(partial.view(), theta, &items).unwrap(),
            expected_partial,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_compute_log_likelihoods_shape_and_values() {
        let items = items();
        let responses = array![[1, 0, 1], [0, 0, -1]];
        let thetas = [-1.0, 0.0, 2.0];
        let result = compute_log_likelihoods(responses.view(), &thetas, &items).unwrap();
        assert_eq!(result.dim(), (2, 3));
        for (i, row) in responses.outer_iter().enumerate() {
            for (q, &theta) in thetas.iter().enumerate() {
                let expected = person_log_likelihood(row, theta, &items).unwrap();
                assert_eq!(result[[i, q]], expected);
            }
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let items = items();
        let responses = array![[1, 0]];
        assert_eq!(
            compute_log_likelihoods(responses.view(), &[0.0], &items),
            Err(IrtError::DimensionMismatch {
                what: "item parameters",
                expected: 2,
                found: 3
            })
        );
        assert!(expected_item_gradient(&[1.0], &[0.0, 1.0], &[0.0, 1.0], &items[0]).is_err());
    }

    #[test]
    fn test_theta_grid_weights_normalized() {
        let (nodes, log_weights) = theta_grid(41, -4.0, 4.0).unwrap();
        assert_eq!(nodes.len(), 41);
        assert_abs_diff_eq!(nodes[0], -4.0);
        assert_abs_diff_eq!(nodes[40], 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(nodes[20], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(logsumexp(&log_weights), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(log_weights[0], log_weights[40], epsilon = 1e-12);

        assert!(theta_grid(1, -4.0, 4.0).is_err());
        assert!(theta_grid(10, 4.0, -4.0).is_err());
    }

    #[test]
    fn test_marginal_log_likelihood() {
        let log_likes = array![[-1.0, -2.0], [-800.0, -801.0]];
        let log_weights = [0.5f64.ln(), 0.5f64.ln()];
        let (per_person, total) =
            marginal_log_likelihood(log_likes.view(), &log_weights).unwrap();

        let first = (0.5 * (-1.0f64).exp() + 0.5 * (-2.0f64).exp()).ln();
        assert_abs_diff_eq!(per_person[0], first, epsilon = 1e-12);
        // would underflow without the max shift
        let second = -800.0 + (0.5 + 0.5 * (-1.0f64).exp()).ln();
        assert_abs_diff_eq!(per_person[1], second, epsilon = 1e-9);
        assert_abs_diff_eq!(total, first + second, epsilon = 1e-9);

        assert!(marginal_log_likelihood(log_likes.view(), &[0.0]).is_err());
    }

    #[test]
    fn test_expected_item_gradient_sums_pointwise() {
        let item = ItemParams::new(1.2, 0.3, 0.1).unwrap();
        let thetas = [-1.0, 0.0, 1.0];
        let y1 = [0.4, 1.5, 2.2];
        let y0 = [1.6, 0.5, 0.3];
        let (d_beta, d_alpha) = expected_item_gradient(&y1, &y0, &thetas, &item).unwrap();

        let mut expected = (0.0, 0.0);
        for q in 0..3 {
            let g = item.item_gradient(Response::new(y1[q], y0[q]).unwrap(), thetas[q]);
            expected.0 += g.0;
            expected.1 += g.1;
        }
        assert_abs_diff_eq!(d_beta, expected.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d_alpha, expected.1, epsilon = 1e-12);
    }
}

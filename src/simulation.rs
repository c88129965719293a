//! Seeded simulation of abilities and dichotomous responses.

use ndarray::Array2;
use rand::prelude::*;
use rand_distr::Normal;
use rand_pcg::Pcg64;
use rayon::prelude::*;

use crate::error::{ensure_finite, IrtError, IrtResult};
use crate::model::ItemParams;

/// Draw `n` abilities from N(mean, sd^2).
pub fn draw_abilities(n: usize, mean: f64, sd: f64, seed: u64) -> IrtResult<Vec<f64>> {
    ensure_finite("mean", mean)?;
    let normal = Normal::new(mean, sd).map_err(|_| IrtError::InvalidOptions {
        name: "sd",
        value: sd,
        reason: "standard deviation must be finite and non-negative",
    })?;
    let mut rng = Pcg64::seed_from_u64(seed);
    Ok((0..n).map(|_| normal.sample(&mut rng)).collect())
}

/// Simulate coded responses (1 correct, 0 incorrect), persons x items.
///
/// Each person gets its own generator seeded with `seed + i`, so results do
/// not depend on how rayon schedules the rows.
pub fn simulate_responses(thetas: &[f64], items: &[ItemParams], seed: u64) -> IrtResult<Array2<i32>> {
    for &theta in thetas {
        ensure_finite("theta", theta)?;
    }

    let n_persons = thetas.len();
    let n_items = items.len();

    let responses: Vec<Vec<i32>> = thetas
        .par_iter()
        .enumerate()
        .map(|(i, &theta)| {
            let mut rng = Pcg64::seed_from_u64(seed.wrapping_add(i as u64));
            items
                .iter()
                .map(|item| {
                    let u: f64 = rng.random();
                    if u < item.probability(theta) {
                        1
                    } else {
                        0
                    }
                })
                .collect()
        })
        .collect();

    let mut result = Array2::zeros((n_persons, n_items));
    for (i, row) in responses.iter().enumerate() {
        for (j, &val) in row.iter().enumerate() {
            result[[i, j]] = val;
        }
    }
    Ok(result)
}

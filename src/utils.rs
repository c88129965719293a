//! Shared numeric helpers: saturating logistic, log guards and log-sum-exp.

/// Stable log(sum(exp(x))) over a slice.
///
/// Empty input gives `-inf`. If the largest element is infinite it is
/// returned directly, so `+inf` propagates and an all `-inf` input stays
/// `-inf` instead of turning into NaN.
#[inline]
pub fn logsumexp(arr: &[f64]) -> f64 {
    if arr.is_empty() {
        return f64::NEG_INFINITY;
    }
    let max_val = arr.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max_val.is_infinite() {
        return max_val;
    }
    let sum: f64 = arr.iter().map(|x| (x - max_val).exp()).sum();
    max_val + sum.ln()
}

/// Logistic function evaluated on the branch that never exponentiates a
/// large positive argument.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let exp_x = x.exp();
        exp_x / (1.0 + exp_x)
    }
}

#[inline]
pub fn log_sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        -(-x).exp().ln_1p()
    } else {
        x - x.exp().ln_1p()
    }
}

#[inline]
pub fn clip(x: f64, min: f64, max: f64) -> f64 {
    x.max(min).min(max)
}

/// Keeps a log-probability finite so a zero response weight never meets `-inf`.
#[inline]
pub fn finite_log(x: f64) -> f64 {
    x.max(f64::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_logsumexp_matches_naive_sum() {
        let log_prob = [-135.0, -115.0, -125.0, -100.0];
        let exact: f64 = log_prob.iter().map(|x: &f64| x.exp()).sum::<f64>().ln();
        assert_abs_diff_eq!(logsumexp(&log_prob), exact, epsilon = 1e-10);
    }

    #[test]
    fn test_logsumexp_survives_underflow() {
        let log_prob = [-1000.0, -1001.0, -1002.0];
        let naive: f64 = log_prob.iter().map(|x: &f64| x.exp()).sum::<f64>().ln();
        assert!(naive.is_infinite());

        let expected = -1000.0 + (1.0 + (-1.0f64).exp() + (-2.0f64).exp()).ln();
        assert_relative_eq!(logsumexp(&log_prob), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_logsumexp_edge_cases() {
        assert_eq!(logsumexp(&[]), f64::NEG_INFINITY);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY, f64::NEG_INFINITY]), f64::NEG_INFINITY);
        assert_eq!(logsumexp(&[1.0, f64::INFINITY]), f64::INFINITY);
        assert_abs_diff_eq!(logsumexp(&[0.0, 0.0]), 2.0f64.ln(), epsilon = 1e-15);
        assert_eq!(logsumexp(&[-3.5]), -3.5);
    }

    #[test]
    fn test_sigmoid_saturates_without_overflow() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid(1.0), 1.0 / (1.0 + (-1.0f64).exp()));
        assert!(sigmoid(-800.0) >= 0.0 && sigmoid(-800.0) < 1e-300);
        assert_eq!(sigmoid(800.0), 1.0);
        assert_relative_eq!(sigmoid(-3.0) + sigmoid(3.0), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_log_sigmoid_matches_log_of_sigmoid() {
        for &x in &[-30.0, -2.0, 0.0, 0.5, 12.0] {
            assert_relative_eq!(log_sigmoid(x), sigmoid(x).ln(), epsilon = 1e-12);
        }
        assert_relative_eq!(log_sigmoid(-800.0), -800.0, epsilon = 1e-12);
    }

    #[test]
    fn test_finite_log() {
        assert_eq!(finite_log(f64::NEG_INFINITY), f64::MIN);
        assert_eq!(finite_log(-1234.5), -1234.5);
        assert_eq!(log_sigmoid(-1e4), -1e4);
    }
}

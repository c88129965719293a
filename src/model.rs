//! Dichotomous 2PL/3PL model kernel.
//!
//! The response probability is
//!
//! ```text
//! P(theta) = c + (1 - c) * sigmoid(alpha * (theta - beta))
//! ```
//!
//! and the log-likelihood of a (possibly fractional) response pair is
//! `y1 * ln P + y0 * ln(1 - P)`. All derivatives are closed form.
//!
//! Parameters are validated eagerly: the free functions return
//! [`IrtError`] for a non-positive discrimination, a guessing floor outside
//! `[0, 1)` or non-finite inputs. [`ItemParams`] carries parameters that
//! have already passed validation, so its methods are infallible and suited
//! to inner loops.

use crate::error::{ensure_finite, IrtError, IrtResult};
use crate::utils::{finite_log, log_sigmoid, sigmoid};

/// Validated item parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemParams {
    alpha: f64,
    beta: f64,
    c: f64,
}

impl ItemParams {
    pub fn new(alpha: f64, beta: f64, c: f64) -> IrtResult<Self> {
        if !(alpha.is_finite() && alpha > 0.0) {
            return Err(IrtError::InvalidDiscrimination { alpha });
        }
        ensure_finite("beta", beta)?;
        if !(0.0..1.0).contains(&c) {
            return Err(IrtError::InvalidGuessing { c });
        }
        Ok(Self { alpha, beta, c })
    }

    /// Item without a guessing floor.
    pub fn two_pl(alpha: f64, beta: f64) -> IrtResult<Self> {
        Self::new(alpha, beta, 0.0)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    /// Probability of a correct response.
    #[inline]
    pub fn probability(&self, theta: f64) -> f64 {
        self.c + (1.0 - self.c) * sigmoid(self.alpha * (theta - self.beta))
    }

    #[inline]
    fn evaluate(&self, theta: f64) -> Evaluation {
        let z = self.alpha * (theta - self.beta);
        let s = sigmoid(z);
        let t = sigmoid(-z);
        let p = self.c + (1.0 - self.c) * s;

        // ln P and ln(1 - P) are taken in log space on the tail where the
        // direct form underflows or cancels.
        let ln_p = if self.c == 0.0 && z < 0.0 {
            log_sigmoid(z)
        } else {
            p.ln()
        };
        let ln_q = if z > 0.0 {
            (-self.c).ln_1p() + log_sigmoid(-z)
        } else {
            (1.0 - p).ln()
        };

        let (dln_p, d2ln_p) = if self.c == 0.0 {
            (t, -s * t)
        } else {
            let d = (1.0 - self.c) * s * t / p;
            (d, d * ((t - s) - d))
        };

        Evaluation {
            ln_p: finite_log(ln_p),
            ln_q: finite_log(ln_q),
            dln_p,
            d2ln_p,
            s,
            t,
        }
    }

    #[inline]
    pub fn log_likelihood(&self, response: Response, theta: f64) -> f64 {
        let e = self.evaluate(theta);
        response.y1 * e.ln_p + response.y0 * e.ln_q
    }

    /// Gradient with respect to the item parameters, ordered `(d/d beta, d/d alpha)`.
    #[inline]
    pub fn item_gradient(&self, response: Response, theta: f64) -> (f64, f64) {
        let dll_dz = self.evaluate(theta).dll_dz(response);
        (-self.alpha * dll_dz, (theta - self.beta) * dll_dz)
    }

    #[inline]
    pub fn ability_gradient(&self, response: Response, theta: f64) -> f64 {
        self.alpha * self.evaluate(theta).dll_dz(response)
    }

    #[inline]
    pub fn ability_hessian(&self, response: Response, theta: f64) -> f64 {
        self.alpha * self.alpha * self.evaluate(theta).d2ll_dz2(response)
    }
}

/// Log-probabilities and their derivatives in the linear predictor
/// `z = alpha * (theta - beta)`.
struct Evaluation {
    ln_p: f64,
    ln_q: f64,
    /// d ln P / dz
    dln_p: f64,
    d2ln_p: f64,
    /// sigmoid(z) and sigmoid(-z); d ln(1 - P) / dz = -s.
    s: f64,
    t: f64,
}

impl Evaluation {
    #[inline]
    fn dll_dz(&self, response: Response) -> f64 {
        response.y1 * self.dln_p - response.y0 * self.s
    }

    #[inline]
    fn d2ll_dz2(&self, response: Response) -> f64 {
        response.y1 * self.d2ln_p - response.y0 * self.s * self.t
    }
}

/// Response weights: `y1` counts correct answers, `y0` incorrect ones.
///
/// The canonical observation is one-hot, but any finite weights are
/// accepted so that expected counts from an E-step can be passed through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Response {
    pub y1: f64,
    pub y0: f64,
}

impl Response {
    pub fn new(y1: f64, y0: f64) -> IrtResult<Self> {
        ensure_finite("y1", y1)?;
        ensure_finite("y0", y0)?;
        Ok(Self { y1, y0 })
    }

    pub const fn correct() -> Self {
        Self { y1: 1.0, y0: 0.0 }
    }

    pub const fn incorrect() -> Self {
        Self { y1: 0.0, y0: 1.0 }
    }

    /// Maps a coded response (1 correct, 0 incorrect, negative missing).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            c if c < 0 => None,
            0 => Some(Self::incorrect()),
            _ => Some(Self::correct()),
        }
    }
}

fn validated(theta: f64, alpha: f64, beta: f64, c: f64) -> IrtResult<ItemParams> {
    ensure_finite("theta", theta)?;
    ItemParams::new(alpha, beta, c)
}

/// Probability of a correct response for ability `theta`.
pub fn irt_fnc(theta: f64, beta: f64, alpha: f64, c: f64) -> IrtResult<f64> {
    Ok(validated(theta, alpha, beta, c)?.probability(theta))
}

pub fn log_likelihood_2pl(
    y1: f64,
    y0: f64,
    theta: f64,
    alpha: f64,
    beta: f64,
    c: f64,
) -> IrtResult<f64> {
    let item = validated(theta, alpha, beta, c)?;
    Ok(item.log_likelihood(Response::new(y1, y0)?, theta))
}

/// Item-parameter gradient `(dLL/d beta, dLL/d alpha)`.
pub fn log_likelihood_2pl_gradient(
    y1: f64,
    y0: f64,
    theta: f64,
    alpha: f64,
    beta: f64,
    c: f64,
) -> IrtResult<(f64, f64)> {
    let item = validated(theta, alpha, beta, c)?;
    Ok(item.item_gradient(Response::new(y1, y0)?, theta))
}

/// dLL/d theta.
pub fn log_likelihood_factor_gradient(
    y1: f64,
    y0: f64,
    theta: f64,
    alpha: f64,
    beta: f64,
    c: f64,
) -> IrtResult<f64> {
    let item = validated(theta, alpha, beta, c)?;
    Ok(item.ability_gradient(Response::new(y1, y0)?, theta))
}

/// d2LL/d theta2, the curvature consumed by a Newton-Raphson ability update.
pub fn log_likelihood_factor_hessian(
    y1: f64,
    y0: f64,
    theta: f64,
    alpha: f64,
    beta: f64,
    c: f64,
) -> IrtResult<f64> {
    let item = validated(theta, alpha, beta, c)?;
    Ok(item.ability_hessian(Response::new(y1, y0)?, theta))
}

//! Log-domain numeric primitives.
//!
//! Marginal likelihoods of even moderately sized clusters fall far outside the range of
//! `f64`, so every model works with natural logarithms and only exponentiates at the end.
//! The helpers here make that last step safe: anything below [`LOG_DBL_MIN`] is flushed
//! to zero instead of producing denormals or NaN.

use statrs::function::gamma::ln_gamma;

use crate::error::{Error, Result};

/// `ln(f64::MIN_POSITIVE)`: the smallest log value whose exponential is a normal `f64`.
pub const LOG_DBL_MIN: f64 = -708.396_418_532_264_1;

/// `ln(f64::MAX)`.
pub const LOG_DBL_MAX: f64 = 709.782_712_893_384;

/// Natural log, or NaN for non-positive input.
#[inline]
pub fn safe_log(x: f64) -> f64 {
    if x > 0.0 {
        x.ln()
    } else {
        f64::NAN
    }
}

/// `ln Γ(x)` for `x > 0`, NaN otherwise.
#[inline]
pub fn log_gamma(x: f64) -> f64 {
    if x > 0.0 {
        ln_gamma(x)
    } else {
        f64::NAN
    }
}

/// `exp(x)`, flushing values below [`LOG_DBL_MIN`] to exactly zero.
#[inline]
pub fn log_exp(x: f64) -> f64 {
    if x < LOG_DBL_MIN {
        0.0
    } else if x > LOG_DBL_MAX {
        f64::INFINITY
    } else {
        x.exp()
    }
}

/// Numerically stable `ln(Σ exp(x_i))`.
///
/// Returns negative infinity for an empty slice or when every term is negative infinity.
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = xs.iter().map(|&x| log_exp(x - max)).sum();
    max + sum.ln()
}

/// Turn unnormalized log weights into probabilities that sum to one.
///
/// The maximum is subtracted before exponentiating; terms still below [`LOG_DBL_MIN`]
/// after the shift become zero. If no weight is finite the result is uniform.
pub fn normalize_discrete(log_weights: &[f64]) -> Vec<f64> {
    if log_weights.is_empty() {
        return Vec::new();
    }

    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        let p = 1.0 / log_weights.len() as f64;
        return vec![p; log_weights.len()];
    }

    let mut out: Vec<f64> = log_weights.iter().map(|&w| log_exp(w - max)).collect();
    // The max term contributes exactly 1, so the sum is never zero.
    let sum: f64 = out.iter().sum();
    for p in &mut out {
        *p /= sum;
    }
    out
}

/// Determinant of a square matrix via LU factorization with partial pivoting.
///
/// The empty matrix has determinant 1. An exactly singular matrix yields 0.
pub fn determinant(matrix: &[Vec<f64>]) -> Result<f64> {
    let k = matrix.len();
    for row in matrix {
        if row.len() != k {
            return Err(Error::DimensionMismatch {
                expected: k,
                found: row.len(),
            });
        }
    }

    // Row-major working copy; factorized in place.
    let mut lu: Vec<f64> = Vec::with_capacity(k * k);
    for row in matrix {
        lu.extend_from_slice(row);
    }

    let mut det = 1.0;
    for col in 0..k {
        let mut pivot = col;
        let mut pivot_abs = lu[col * k + col].abs();
        for r in (col + 1)..k {
            let v = lu[r * k + col].abs();
            if v > pivot_abs {
                pivot = r;
                pivot_abs = v;
            }
        }

        if pivot_abs == 0.0 {
            return Ok(0.0);
        }

        if pivot != col {
            for c in 0..k {
                lu.swap(col * k + c, pivot * k + c);
            }
            det = -det;
        }

        let diag = lu[col * k + col];
        det *= diag;

        for r in (col + 1)..k {
            let factor = lu[r * k + col] / diag;
            if factor == 0.0 {
                continue;
            }
            for c in (col + 1)..k {
                lu[r * k + c] -= factor * lu[col * k + c];
            }
        }
    }

    Ok(det)
}

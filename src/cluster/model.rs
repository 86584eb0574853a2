//! Conjugate marginal-likelihood models.
//!
//! Each model answers one question: how probable is this set of observations, with the
//! model parameters integrated out against a conjugate prior? That number, `P(D | H)`,
//! is what the Bayesian scorer compares between the "one cluster" and "two clusters"
//! hypotheses.
//!
//! | Model | Data point | Prior |
//! |---|---|---|
//! | [`NormalWishart`] | `&[f64]` of length `k` | Normal-Wishart on mean and precision |
//! | [`BernoulliBeta`] | `&[bool]` of length `k` | independent Beta per dimension |
//! | [`DirichletMultinomial`] | `&[u32]` counts over `k` categories | Dirichlet |
//!
//! All three follow the convention `P(∅) = 1`.

use crate::error::{Error, Result};
use crate::math::{determinant, log_exp, log_gamma, safe_log};

/// A prior over data points of type `T` that can score any subset of them.
pub trait MarginalLikelihood<T: ?Sized> {
    /// Dimensionality each data point must have.
    fn dimension(&self) -> usize;

    /// `ln P(points | model)`; zero for an empty set.
    fn ln_evaluate(&self, points: &[&T]) -> Result<f64>;

    /// `P(points | model)`, flushed to zero on underflow.
    fn evaluate(&self, points: &[&T]) -> Result<f64> {
        Ok(log_exp(self.ln_evaluate(points)?))
    }
}

impl<T: ?Sized, M: MarginalLikelihood<T> + ?Sized> MarginalLikelihood<T> for &M {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn ln_evaluate(&self, points: &[&T]) -> Result<f64> {
        (**self).ln_evaluate(points)
    }
}

fn check_dimension(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::DimensionMismatch { expected, found })
    }
}

/// Relative tolerance for treating a scale matrix as symmetric.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Symmetric and positive-definite, checked by attempting a Cholesky factorization.
fn check_scale(scale: &[Vec<f64>]) -> Result<()> {
    let invalid = Error::InvalidParameter {
        name: "scale",
        message: "must be symmetric positive-definite",
    };
    let k = scale.len();
    for i in 0..k {
        for j in (i + 1)..k {
            let (a, b) = (scale[i][j], scale[j][i]);
            if !a.is_finite() || (a - b).abs() > SYMMETRY_TOLERANCE * a.abs().max(b.abs()).max(1.0)
            {
                return Err(invalid);
            }
        }
    }

    let mut l = vec![vec![0.0; k]; k];
    for j in 0..k {
        let pivot = scale[j][j] - l[j][..j].iter().map(|x| x * x).sum::<f64>();
        if !(pivot > 0.0) || !pivot.is_finite() {
            return Err(invalid);
        }
        l[j][j] = pivot.sqrt();
        for i in (j + 1)..k {
            let dot: f64 = l[i][..j].iter().zip(&l[j][..j]).map(|(a, b)| a * b).sum();
            l[i][j] = (scale[i][j] - dot) / l[j][j];
        }
    }
    Ok(())
}

/// `ln |det m|`. Rounding can make the determinant of a nearly singular positive-definite
/// matrix come out negative; taking the absolute value keeps the log finite.
fn ln_abs_det(m: &[Vec<f64>]) -> Result<f64> {
    Ok(safe_log(determinant(m)?.abs()))
}

fn check_positive(name: &'static str, values: &[f64]) -> Result<()> {
    if values.iter().all(|&v| v > 0.0 && v.is_finite()) {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name,
            message: "must be finite and positive",
        })
    }
}

// ---------------------------------------------------------------------------
// Normal-Wishart
// ---------------------------------------------------------------------------

/// Multivariate Gaussian with unknown mean and precision under a Normal-Wishart prior.
///
/// The prior is parametrized by a mean `m`, a `k × k` scale matrix `s`, a scalar `r`
/// scaling the precision of the mean, and degrees of freedom `v`. With `n` points the
/// posterior has `v' = v + n` and
///
/// ```text
/// S' = S + Σ x xᵀ + rn/(n+r) m mᵀ − 1/(n+r) (Σx)(Σx)ᵀ − r/(n+r) (m (Σx)ᵀ + (Σx) mᵀ)
/// ```
///
/// giving
///
/// ```text
/// P(D) = π^(−nk/2) (r/(r+n))^(k/2) |S|^(v/2) / |S'|^(v'/2) Π_d Γ((v'+1−d)/2) / Γ((v+1−d)/2)
/// ```
///
/// Both determinants go through `abs()` before the logarithm. Rounding can push the
/// determinant of a nearly singular `S'` below zero; the guard keeps the result finite
/// but hides how inaccurate it is.
#[derive(Clone, Debug)]
pub struct NormalWishart {
    mean: Vec<f64>,
    scale: Vec<Vec<f64>>,
    r: f64,
    v: f64,
    ln_det_scale: f64,
}

impl NormalWishart {
    /// Create a Normal-Wishart prior.
    ///
    /// Fails if `scale` is not a symmetric positive-definite `k × k` matrix for
    /// `k = mean.len()`, if `k == 0`, if `r <= 0`, or if `v <= k - 1`.
    pub fn new(mean: Vec<f64>, scale: Vec<Vec<f64>>, r: f64, v: f64) -> Result<Self> {
        let k = mean.len();
        if k == 0 {
            return Err(Error::InvalidParameter {
                name: "mean",
                message: "must have at least one dimension",
            });
        }
        check_dimension(k, scale.len())?;
        for row in &scale {
            check_dimension(k, row.len())?;
        }
        check_positive("r", &[r])?;
        if !(v > (k - 1) as f64) || !v.is_finite() {
            return Err(Error::InvalidParameter {
                name: "v",
                message: "degrees of freedom must exceed dimension - 1",
            });
        }

        check_scale(&scale)?;
        let ln_det_scale = ln_abs_det(&scale)?;
        if !ln_det_scale.is_finite() {
            return Err(Error::InvalidParameter {
                name: "scale",
                message: "must be non-singular",
            });
        }

        Ok(Self {
            mean,
            scale,
            r,
            v,
            ln_det_scale,
        })
    }

    /// Prior with mean zero, identity scale, `r = 1`, and `v = k + 1`.
    pub fn standard(k: usize) -> Result<Self> {
        let scale = (0..k)
            .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self::new(vec![0.0; k], scale, 1.0, (k + 1) as f64)
    }

    /// Prior mean `m`.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Prior scale matrix `s`.
    pub fn scale(&self) -> &[Vec<f64>] {
        &self.scale
    }

    /// Precision scaling `r`.
    pub fn r(&self) -> f64 {
        self.r
    }

    /// Degrees of freedom `v`.
    pub fn v(&self) -> f64 {
        self.v
    }

    fn posterior_scale<T: AsRef<[f64]> + ?Sized>(&self, points: &[&T]) -> Result<Vec<Vec<f64>>> {
        let k = self.mean.len();
        let n = points.len() as f64;

        let mut sum = vec![0.0; k];
        let mut s = self.scale.clone();
        for p in points {
            let x = p.as_ref();
            check_dimension(k, x.len())?;
            for i in 0..k {
                sum[i] += x[i];
                for j in 0..k {
                    s[i][j] += x[i] * x[j];
                }
            }
        }

        let m = &self.mean;
        let c_mm = self.r * n / (n + self.r);
        let c_ss = 1.0 / (n + self.r);
        let c_ms = self.r / (n + self.r);
        for i in 0..k {
            for j in 0..k {
                s[i][j] += c_mm * m[i] * m[j] - c_ss * sum[i] * sum[j]
                    - c_ms * (m[i] * sum[j] + sum[i] * m[j]);
            }
        }
        Ok(s)
    }
}

impl<T: AsRef<[f64]> + ?Sized> MarginalLikelihood<T> for NormalWishart {
    fn dimension(&self) -> usize {
        self.mean.len()
    }

    fn ln_evaluate(&self, points: &[&T]) -> Result<f64> {
        if points.is_empty() {
            return Ok(0.0);
        }

        let k = self.mean.len() as f64;
        let n = points.len() as f64;
        let v_post = self.v + n;

        let s_post = self.posterior_scale(points)?;
        let ln_det_post = ln_abs_det(&s_post)?;

        let mut ln_p = -0.5 * n * k * std::f64::consts::PI.ln()
            + 0.5 * k * (self.r.ln() - (self.r + n).ln())
            + 0.5 * self.v * self.ln_det_scale
            - 0.5 * v_post * ln_det_post;

        for d in 1..=self.mean.len() {
            let d = d as f64;
            ln_p += log_gamma((v_post + 1.0 - d) / 2.0) - log_gamma((self.v + 1.0 - d) / 2.0);
        }

        Ok(ln_p)
    }
}

// ---------------------------------------------------------------------------
// Bernoulli-Beta
// ---------------------------------------------------------------------------

/// Independent binary features, each with a `Beta(alpha_d, beta_d)` prior.
#[derive(Clone, Debug)]
pub struct BernoulliBeta {
    alpha: Vec<f64>,
    beta: Vec<f64>,
}

impl BernoulliBeta {
    /// Create a Bernoulli-Beta prior; `alpha` and `beta` must be equally long and positive.
    pub fn new(alpha: Vec<f64>, beta: Vec<f64>) -> Result<Self> {
        if alpha.is_empty() {
            return Err(Error::InvalidParameter {
                name: "alpha",
                message: "must have at least one dimension",
            });
        }
        check_dimension(alpha.len(), beta.len())?;
        check_positive("alpha", &alpha)?;
        check_positive("beta", &beta)?;
        Ok(Self { alpha, beta })
    }

    /// Uniform `Beta(1, 1)` prior on every dimension.
    pub fn uniform(k: usize) -> Result<Self> {
        Self::new(vec![1.0; k], vec![1.0; k])
    }

    /// Per-dimension `alpha`.
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Per-dimension `beta`.
    pub fn beta(&self) -> &[f64] {
        &self.beta
    }
}

impl<T: AsRef<[bool]> + ?Sized> MarginalLikelihood<T> for BernoulliBeta {
    fn dimension(&self) -> usize {
        self.alpha.len()
    }

    fn ln_evaluate(&self, points: &[&T]) -> Result<f64> {
        if points.is_empty() {
            return Ok(0.0);
        }

        let k = self.alpha.len();
        let mut ones = vec![0usize; k];
        for p in points {
            let bits = p.as_ref();
            check_dimension(k, bits.len())?;
            for (count, &bit) in ones.iter_mut().zip(bits) {
                if bit {
                    *count += 1;
                }
            }
        }

        let n = points.len() as f64;
        let ln_p = self
            .alpha
            .iter()
            .zip(&self.beta)
            .zip(&ones)
            .map(|((&a, &b), &m)| {
                let m = m as f64;
                log_gamma(a + b) + log_gamma(a + m) + log_gamma(b + n - m)
                    - log_gamma(a)
                    - log_gamma(b)
                    - log_gamma(a + b + n)
            })
            .sum();
        Ok(ln_p)
    }
}

// ---------------------------------------------------------------------------
// Dirichlet-Multinomial
// ---------------------------------------------------------------------------

/// Category count vectors drawn from a multinomial with a `Dirichlet(alpha)` prior.
///
/// Each data point is a vector of counts `x_i` over `k` categories. The marginal
/// likelihood of `n` such points, including each point's multinomial coefficient, is
///
/// ```text
/// P(D) = Π_i N_i! / Π_j x_ij!  ·  Γ(Σα) / Γ(Σα + N)  ·  Π_j Γ(α_j + X_j) / Γ(α_j)
/// ```
///
/// with `N_i = Σ_j x_ij`, `X_j = Σ_i x_ij` and `N = Σ_j X_j`.
#[derive(Clone, Debug)]
pub struct DirichletMultinomial {
    alpha: Vec<f64>,
    alpha_sum: f64,
}

impl DirichletMultinomial {
    /// Create a Dirichlet-Multinomial prior with positive concentration `alpha`.
    pub fn new(alpha: Vec<f64>) -> Result<Self> {
        if alpha.is_empty() {
            return Err(Error::InvalidParameter {
                name: "alpha",
                message: "must have at least one category",
            });
        }
        check_positive("alpha", &alpha)?;
        let alpha_sum = alpha.iter().sum();
        Ok(Self { alpha, alpha_sum })
    }

    /// Per-category concentration.
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }
}

impl<T: AsRef<[u32]> + ?Sized> MarginalLikelihood<T> for DirichletMultinomial {
    fn dimension(&self) -> usize {
        self.alpha.len()
    }

    fn ln_evaluate(&self, points: &[&T]) -> Result<f64> {
        if points.is_empty() {
            return Ok(0.0);
        }

        let k = self.alpha.len();
        let mut totals = vec![0.0f64; k];
        let mut ln_p = 0.0;
        for p in points {
            let counts = p.as_ref();
            check_dimension(k, counts.len())?;
            let mut n_i = 0.0;
            for (total, &x) in totals.iter_mut().zip(counts) {
                let x = f64::from(x);
                *total += x;
                n_i += x;
                ln_p -= log_gamma(x + 1.0);
            }
            ln_p += log_gamma(n_i + 1.0);
        }

        let n: f64 = totals.iter().sum();
        ln_p += log_gamma(self.alpha_sum) - log_gamma(self.alpha_sum + n);
        for (&a, &x) in self.alpha.iter().zip(&totals) {
            ln_p += log_gamma(a + x) - log_gamma(a);
        }
        Ok(ln_p)
    }
}

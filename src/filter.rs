//! Heat-kernel spectral filter `g(λ) = exp(−τλ)` and its truncated Chebyshev expansion.
//!
//! ## Chebyshev approximation
//!
//! On the spectral interval `[0, λ_max]`, with `a = λ_max / 2` and
//! `x = (λ − a) / a ∈ [−1, 1]`:
//!
//! ```text
//! g(λ) ≈ c_0/2 + Σ_{k=1}^{m} c_k · T_k(x)
//! c_k  = 2/(m+1) · Σ_{j=0}^{m} cos(kπ(j+½)/(m+1)) · g(a·cos(π(j+½)/(m+1)) + a)
//! ```
//!
//! Applied to a graph signal `f` without touching the eigenbasis:
//!
//! ```text
//! T_0 f = f
//! T_1 f = (L f − a f) / a
//! T_k f = 2/a · (L − a) T_{k−1} f − T_{k−2} f
//! ```
//!
//! Cost: `m` sparse Laplacian products per signal.

use std::f64::consts::PI;

use crate::spectral::Laplacian;
use crate::{Error, Result};

/// `exp(−τλ)` with a validated scale `τ > 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawHeatKernel"))]
pub struct HeatKernel {
    scale: f64,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawHeatKernel {
    scale: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawHeatKernel> for HeatKernel {
    type Error = Error;

    fn try_from(raw: RawHeatKernel) -> Result<Self> {
        Self::new(raw.scale)
    }
}

impl HeatKernel {
    pub fn new(scale: f64) -> Result<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(Error::Configuration(format!(
                "heat kernel scale must be finite and > 0, got {scale}"
            )));
        }
        Ok(Self { scale })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    pub fn response(&self, lambda: f64) -> f64 {
        (-self.scale * lambda).exp()
    }

    /// Degree-`order` Chebyshev expansion of this kernel over `[0, lmax]`.
    pub fn chebyshev(&self, order: usize, lmax: f64) -> Result<ChebyshevApproximation> {
        ChebyshevApproximation::fit(|lambda| self.response(lambda), order, lmax)
    }
}

/// Truncated Chebyshev series of a scalar filter over `[0, lmax]`.
///
/// Always holds at least two coefficients and a finite `lmax > 0`; deserialization goes
/// through [`ChebyshevApproximation::from_coefficients`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawChebyshev"))]
pub struct ChebyshevApproximation {
    coefficients: Vec<f64>,
    lmax: f64,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawChebyshev {
    coefficients: Vec<f64>,
    lmax: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawChebyshev> for ChebyshevApproximation {
    type Error = Error;

    fn try_from(raw: RawChebyshev) -> Result<Self> {
        Self::from_coefficients(raw.coefficients, raw.lmax)
    }
}

impl ChebyshevApproximation {
    /// Fit `filter` with `order + 1` coefficients by Gauss–Chebyshev quadrature.
    pub fn fit<F: Fn(f64) -> f64>(filter: F, order: usize, lmax: f64) -> Result<Self> {
        check_order(order)?;
        check_lmax(lmax)?;

        let points = order + 1;
        let half = lmax / 2.0;
        let angles: Vec<f64> = (0..points)
            .map(|j| PI * (j as f64 + 0.5) / points as f64)
            .collect();
        let samples: Vec<f64> = angles
            .iter()
            .map(|&theta| filter(half * theta.cos() + half))
            .collect();

        let coefficients = (0..points)
            .map(|k| {
                let s: f64 = angles
                    .iter()
                    .zip(&samples)
                    .map(|(&theta, &g)| (k as f64 * theta).cos() * g)
                    .sum();
                2.0 * s / points as f64
            })
            .collect();

        Ok(Self { coefficients, lmax })
    }

    /// Use precomputed coefficients `c_0..c_m` (with `c_0` not yet halved) over `[0, lmax]`.
    pub fn from_coefficients(coefficients: Vec<f64>, lmax: f64) -> Result<Self> {
        check_order(coefficients.len().saturating_sub(1))?;
        check_lmax(lmax)?;
        if let Some(k) = coefficients.iter().position(|c| !c.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "Chebyshev coefficient {k} is not finite"
            )));
        }
        Ok(Self { coefficients, lmax })
    }

    /// Polynomial degree `m`.
    pub fn order(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn lmax(&self) -> f64 {
        self.lmax
    }

    /// Evaluate the expansion at a scalar `lambda` (Clenshaw recurrence).
    pub fn eval(&self, lambda: f64) -> f64 {
        let half = self.lmax / 2.0;
        let x = (lambda - half) / half;
        let mut b_next = 0.0;
        let mut b_curr = 0.0;
        for &c in self.coefficients[1..].iter().rev() {
            let b = 2.0 * x * b_curr - b_next + c;
            b_next = b_curr;
            b_curr = b;
        }
        0.5 * self.coefficients[0] + x * b_curr - b_next
    }

    /// Filter `signal` through `laplacian` with the three-term recurrence.
    pub fn apply(&self, laplacian: &Laplacian, signal: &[f64]) -> Result<Vec<f64>> {
        let n = laplacian.node_count();
        if signal.len() != n {
            return Err(Error::CoefficientLength {
                expected: n,
                actual: signal.len(),
            });
        }

        let half = self.lmax / 2.0;
        // (L − a)·v / a
        let shifted = |v: &[f64]| -> Vec<f64> {
            laplacian
                .apply(v)
                .iter()
                .zip(v)
                .map(|(lv, vi)| (lv - half * vi) / half)
                .collect()
        };

        let c = &self.coefficients;
        let mut t_prev = signal.to_vec();
        let mut t_curr = shifted(signal);
        let mut out: Vec<f64> = t_prev
            .iter()
            .zip(&t_curr)
            .map(|(t0, t1)| 0.5 * c[0] * t0 + c[1] * t1)
            .collect();

        for &ck in &c[2..] {
            let t_next: Vec<f64> = shifted(&t_curr)
                .iter()
                .zip(&t_prev)
                .map(|(s, tp)| 2.0 * s - tp)
                .collect();
            for (o, t) in out.iter_mut().zip(&t_next) {
                *o += ck * t;
            }
            t_prev = t_curr;
            t_curr = t_next;
        }

        Ok(out)
    }
}

fn check_order(order: usize) -> Result<()> {
    if order == 0 {
        return Err(Error::InvalidParameter(
            "Chebyshev approximation order must be >= 1".to_string(),
        ));
    }
    Ok(())
}

fn check_lmax(lmax: f64) -> Result<()> {
    if !lmax.is_finite() || lmax <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "spectral interval upper bound must be finite and > 0, got {lmax}"
        )));
    }
    Ok(())
}

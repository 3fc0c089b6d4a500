//! Crude moments of a function over the whole real line, used to seed the
//! envelope fit.

use crate::config::ExpansionConfig;
use crate::numerics::integrate::integrate_adaptive;

/// Total weight, mean and standard deviation of `x` weighted by `f(x)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassicMoments {
    /// `∫ f(x) dx`
    pub total: f64,
    /// `∫ x f(x) dx / total`, or 0 when the total vanishes.
    pub mean: f64,
    /// `√(∫ x² f(x) dx / total - mean²)`, clamped at 0; 0 when the total vanishes.
    pub dispersion: f64,
}

impl ClassicMoments {
    /// True when the moments cannot seed a Gaussian: no total weight, a
    /// non-positive dispersion, or non-finite values.
    pub fn is_degenerate(&self) -> bool {
        self.total == 0.0
            || !(self.dispersion > 0.0)
            || !self.total.is_finite()
            || !self.mean.is_finite()
            || !self.dispersion.is_finite()
    }
}

/// Integrand in the scaled variable `z ∈ (0, 1)`, with `x = exp(1/(1-z) - 1/z)`
/// covering `(0, ∞)` and the negative half-line folded in through `f(-x)`.
fn moments_integrand<F>(fnc: &F, z: f64, out: &mut [f64])
where
    F: Fn(f64) -> f64,
{
    let x = (1.0 / (1.0 - z) - 1.0 / z).exp();
    let jacobian = x * (1.0 / (1.0 - z).powi(2) + 1.0 / (z * z));
    let fp = fnc(x);
    let fm = fnc(-x);
    if (fp == 0.0 && fm == 0.0) || !jacobian.is_finite() {
        out.fill(0.0);
    } else {
        out[0] = (fp + fm) * jacobian;
        out[1] = (fp - fm) * jacobian * x;
        out[2] = (fp + fm) * jacobian * x * x;
    }
}

/// Estimates the classic moments of `fnc` with a single adaptive integral.
pub fn estimate_moments<F>(fnc: &F, config: &ExpansionConfig) -> ClassicMoments
where
    F: Fn(f64) -> f64,
{
    let integral = integrate_adaptive(
        |z, out: &mut [f64]| moments_integrand(fnc, z, out),
        0.0,
        1.0,
        3,
        config.moments_rel_tolerance,
        config.moments_max_evaluations,
    );
    if !integral.converged {
        log::debug!(
            "Moment integral stopped at {} evaluations with error {:.3e}",
            integral.evaluations,
            integral.error
        );
    }

    let total = integral.values[0];
    let (mean, dispersion) = if total != 0.0 {
        let mean = integral.values[1] / total;
        let variance = integral.values[2] / total - mean * mean;
        (mean, variance.max(0.0).sqrt())
    } else {
        (0.0, 0.0)
    };

    log::debug!("Classic moments: total={total:.6e}, mean={mean:.6e}, dispersion={dispersion:.6e}");
    ClassicMoments {
        total,
        mean,
        dispersion,
    }
}

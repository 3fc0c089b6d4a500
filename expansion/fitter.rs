//! Least-squares model for fitting the Gaussian envelope of a Gauss-Hermite expansion.
//!
//! A GH expansion of fit order `K` has `K + 1` free parameters: the amplitude,
//! center and width of the base Gaussian, followed by `h_3 .. h_K` (with the
//! convention `h_0 = 1`, `h_1 = h_2 = 0`). Residuals are taken at `Q = 2 N² + 1`
//! equally spaced points `y_p = (p - N²) / N` in the scaled variable, whose
//! location on the x axis follows the current center and width.

use crate::hermite::hermite_into;
use crate::numerics::levmar::LeastSquaresModel;
use crate::projector::QUADORDER;
use ndarray::{ArrayView1, ArrayViewMut1, ArrayViewMut2};
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Number of residual nodes of the envelope fit.
pub const NUM_FIT_NODES: usize = 2 * QUADORDER * QUADORDER + 1;

/// Residuals `√w f(c + w y_p) - A g(y_p)` with `g(y) = exp(-y²/2) (1 + Σ h_n H_n(y)) / √(2π w)`.
///
/// The `√w` weighting keeps the problem equally well conditioned across very
/// different widths.
pub struct EnvelopeFitter<'a, F> {
    fit_order: usize,
    fnc: &'a F,
}

impl<'a, F> EnvelopeFitter<'a, F>
where
    F: Fn(f64) -> f64,
{
    /// `fit_order` below 2 is raised to 2 (amplitude, center and width are always fitted).
    pub fn new(fit_order: usize, fnc: &'a F) -> Self {
        Self {
            fit_order: fit_order.max(2),
            fnc,
        }
    }

    pub fn fit_order(&self) -> usize {
        self.fit_order
    }
}

impl<F> LeastSquaresModel for EnvelopeFitter<'_, F>
where
    F: Fn(f64) -> f64,
{
    fn num_params(&self) -> usize {
        self.fit_order + 1
    }

    fn num_residuals(&self) -> usize {
        NUM_FIT_NODES
    }

    fn evaluate(
        &self,
        params: ArrayView1<f64>,
        mut residuals: ArrayViewMut1<f64>,
        mut jacobian: Option<ArrayViewMut2<f64>>,
    ) {
        let ampl = params[0];
        let center = params[1];
        let width = params[2];
        let sqrt_width = width.sqrt();
        let q = QUADORDER as f64;
        let half_span = QUADORDER * QUADORDER;
        let mut hpoly = vec![0.0; self.fit_order + 1];

        for p in 0..NUM_FIT_NODES {
            let y = (1.0 / q) * (p as f64 - half_span as f64);
            let x = center + width * y;
            hermite_into(y, &mut hpoly);
            let mut sum = 1.0;
            for n in 3..=self.fit_order {
                sum += params[n] * hpoly[n];
            }
            let mult = FRAC_1_SQRT_2 / PI.sqrt() * (-0.5 * y * y).exp() * sum / sqrt_width;
            residuals[p] = sqrt_width * (self.fnc)(x) - mult * ampl;

            if let Some(jac) = jacobian.as_mut() {
                jac[[p, 0]] = -mult;
                jac[[p, 1]] = -mult * ampl / width * y;
                jac[[p, 2]] = mult * ampl / width * (1.0 - y * y);
                for n in 3..=self.fit_order {
                    jac[[p, n]] = -mult * ampl / sum * hpoly[n];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    fn gaussian(x: f64) -> f64 {
        let y = (x - 0.4) / 1.3;
        2.0 / (1.3 * (2.0 * PI).sqrt()) * (-0.5 * y * y).exp()
    }

    #[test]
    fn residuals_vanish_at_the_true_envelope() {
        let fitter = EnvelopeFitter::new(2, &gaussian);
        let params = Array1::from(vec![2.0, 0.4, 1.3]);
        let mut residuals = Array1::zeros(NUM_FIT_NODES);
        fitter.evaluate(params.view(), residuals.view_mut(), None);
        assert_eq!(residuals.len(), 99);
        assert!(residuals.iter().all(|r| r.abs() < 1e-14));
    }

    #[test]
    fn jacobian_matches_finite_differences_at_the_optimum() {
        // The partials treat f as matching the model, so they agree with finite
        // differences at the optimum.
        let fitter = EnvelopeFitter::new(2, &gaussian);
        let params = Array1::from(vec![2.0, 0.4, 1.3]);
        let mut residuals = Array1::zeros(NUM_FIT_NODES);
        let mut jacobian = Array2::zeros((NUM_FIT_NODES, 3));
        fitter.evaluate(params.view(), residuals.view_mut(), Some(jacobian.view_mut()));

        let h = 1e-6;
        for k in 0..3 {
            let mut plus = params.clone();
            let mut minus = params.clone();
            plus[k] += h;
            minus[k] -= h;
            let mut r_plus = Array1::zeros(NUM_FIT_NODES);
            let mut r_minus = Array1::zeros(NUM_FIT_NODES);
            fitter.evaluate(plus.view(), r_plus.view_mut(), None);
            fitter.evaluate(minus.view(), r_minus.view_mut(), None);
            for p in 0..NUM_FIT_NODES {
                let numeric = (r_plus[p] - r_minus[p]) / (2.0 * h);
                assert!(
                    (numeric - jacobian[[p, k]]).abs() < 1e-6,
                    "param {k}, node {p}: analytic {} vs numeric {numeric}",
                    jacobian[[p, k]]
                );
            }
        }
    }

    #[test]
    fn auxiliary_coefficients_extend_the_parameter_vector() {
        let fitter = EnvelopeFitter::new(5, &gaussian);
        assert_eq!(fitter.num_params(), 6);
        assert_eq!(EnvelopeFitter::new(0, &gaussian).fit_order(), 2);

        let params = Array1::from(vec![2.0, 0.4, 1.3, 0.1, -0.05, 0.0]);
        let mut residuals = Array1::zeros(NUM_FIT_NODES);
        let mut jacobian = Array2::zeros((NUM_FIT_NODES, 6));
        fitter.evaluate(params.view(), residuals.view_mut(), Some(jacobian.view_mut()));
        // The central node sits at y = 0 where the odd polynomial h_3 vanishes.
        assert_eq!(jacobian[[NUM_FIT_NODES / 2, 3]], 0.0);
        assert!(jacobian[[NUM_FIT_NODES / 2, 4]] != 0.0);
    }
}

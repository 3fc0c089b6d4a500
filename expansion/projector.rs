//! Gauss-Hermite coefficients of a function for a settled envelope.
//!
//! The weighted integrals `∫ f(x) H_n(y) exp(-y²/2) dx` run over the whole real
//! axis, and `f` is in general only piecewise smooth, so a Gauss-Hermite rule is
//! not applicable. Instead the nodes are `2N² + 1` equally spaced points
//! `-N, .., -1/N, 0, 1/N, .., N` in the scaled variable and
//! `∫ g(y) exp(-y²) dy ≈ (1/N) Σ_{i=-N²}^{N²} g(i/N) exp(-(i/N)²)`.
//! Even and odd Hermite functions fold the two halves onto the `N² + 1`
//! non-negative nodes.

use crate::hermite::hermite_into;
use crate::model::Envelope;
use ndarray::Array1;
use std::f64::consts::SQRT_2;

/// Node density `N` of the fixed equally spaced quadrature (99 nodes in total).
pub const QUADORDER: usize = 7;

/// Computes `h_0 .. h_order` of `fnc` with respect to `envelope`.
///
/// `h_0` is close to one when the envelope came from the matching fit. A zero
/// amplitude gives non-finite coefficients.
pub fn project_coefficients<F>(fnc: &F, order: usize, envelope: &Envelope) -> Array1<f64>
where
    F: Fn(f64) -> f64,
{
    let Envelope {
        amplitude,
        center,
        width,
    } = *envelope;
    let q = QUADORDER as f64;
    let mut hpoly = vec![0.0; order + 1];
    let mut result = Array1::zeros(order + 1);

    for p in 0..=QUADORDER * QUADORDER {
        let y = p as f64 * (1.0 / q);
        let mult = SQRT_2 * width / amplitude / q * (-0.5 * y * y).exp();
        let fp = fnc(center + width * y);
        let fm = if p == 0 { 0.0 } else { fnc(center - width * y) };
        hermite_into(y, &mut hpoly);
        for (i, h) in result.iter_mut().enumerate() {
            let folded = if i % 2 == 1 { fp - fm } else { fp + fm };
            *h += mult * folded * hpoly[i];
        }
    }
    result
}

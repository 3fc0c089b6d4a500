//! Hermite polynomials in the normalization used for Gauss-Hermite expansions.
//!
//! This is neither the probabilists' nor the physicists' convention:
//! `H_0 = 1`, `H_1 = √2 y`, `H_{n+1} = (√2 y H_n - √n H_{n-1}) / √(n+1)`.
//! With it, `dH_n/dy = √(2n) H_{n-1}`,
//! `∫ H_n H_m exp(-y²) dy / (2π) = δ_nm / (2√π)`, and
//! `∫ H_n exp(-y²/2) dy / √(2π) = √(n!) / n!!` for even `n`.

use ndarray::Array1;
use std::f64::consts::SQRT_2;

/// Fills `out` with `H_0(y) .. H_{out.len()-1}(y)`. An empty slice is left untouched.
pub fn hermite_into(y: f64, out: &mut [f64]) {
    let Some(first) = out.first_mut() else {
        return;
    };
    *first = 1.0;
    if out.len() < 2 {
        return;
    }
    out[1] = SQRT_2 * y;
    let mut sqrt_n = 1.0;
    for n in 1..out.len() - 1 {
        let sqrt_n_plus_1 = ((n + 1) as f64).sqrt();
        out[n + 1] = (SQRT_2 * y * out[n] - sqrt_n * out[n - 1]) / sqrt_n_plus_1;
        sqrt_n = sqrt_n_plus_1;
    }
}

/// Returns `[H_0(y), .., H_max_degree(y)]`.
///
/// `H_0` is always included, so `max_degree = 0` yields `[1]` rather than an
/// empty array. Use [`hermite_into`] with an empty slice for the no-output case.
pub fn hermite_array(max_degree: usize, y: f64) -> Array1<f64> {
    let mut result = Array1::zeros(max_degree + 1);
    if let Some(slice) = result.as_slice_mut() {
        hermite_into(y, slice);
    }
    result
}

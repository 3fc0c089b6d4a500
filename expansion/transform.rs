//! Linear map from B-spline amplitudes to Gauss-Hermite coefficients.
//!
//! A function given as `f(x) = Σ_j A_j B_j(x)` over degree-N B-splines has GH
//! coefficients `h_m = Σ_j C_mj A_j`. Each `C_mj` is an integral of `B_j(x) H_m(y)`
//! against the Gaussian weight; the product is a polynomial of degree `N + m`
//! times an exponential, integrated with a Gauss-Legendre rule on every grid segment.

use crate::hermite::hermite_into;
use crate::model::{Envelope, ExpansionError};
use crate::numerics::bspline::{BsplineBasis, MAX_DEGREE};
use crate::numerics::legendre::{MAX_GL_NODES, gauss_legendre};
use ndarray::Array2;
use std::f64::consts::SQRT_2;

/// Spline degrees supported by the transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplineDegree {
    Constant,
    Linear,
    Quadratic,
    Cubic,
}

impl SplineDegree {
    pub fn as_usize(self) -> usize {
        match self {
            SplineDegree::Constant => 0,
            SplineDegree::Linear => 1,
            SplineDegree::Quadratic => 2,
            SplineDegree::Cubic => 3,
        }
    }
}

impl TryFrom<usize> for SplineDegree {
    type Error = ExpansionError;

    fn try_from(degree: usize) -> Result<Self, Self::Error> {
        match degree {
            0 => Ok(SplineDegree::Constant),
            1 => Ok(SplineDegree::Linear),
            2 => Ok(SplineDegree::Quadratic),
            3 => Ok(SplineDegree::Cubic),
            other => Err(ExpansionError::UnsupportedSplineDegree(other)),
        }
    }
}

/// Number of Gauss-Legendre nodes per grid segment for spline degree `degree`
/// and expansion order `order`.
pub fn nodes_per_segment(degree: usize, order: usize) -> usize {
    ((degree + order + 1) / 2 + 1).max(3).min(MAX_GL_NODES)
}

/// Builds the `(order + 1) × num_functions` matrix for an existing basis.
pub fn gauss_hermite_matrix(basis: &BsplineBasis, order: usize, envelope: &Envelope) -> Array2<f64> {
    let Envelope {
        amplitude,
        center,
        width,
    } = *envelope;
    let degree = basis.degree();
    let rule = gauss_legendre(nodes_per_segment(degree, order));
    let grid = basis.grid();
    let mut hpoly = vec![0.0; order + 1];
    let mut bspl = [0.0; MAX_DEGREE + 1];
    let mut result = Array2::zeros((order + 1, basis.num_functions()));

    for segment in grid.windows(2) {
        let x1 = segment[0];
        let dx = segment[1] - x1;
        for (&node, &weight) in rule.nodes.iter().zip(rule.weights.iter()) {
            let x = x1 + dx * node;
            let left = basis.nonzero_components(x, &mut bspl);
            let y = (x - center) / width;
            hermite_into(y, &mut hpoly);
            let mult = SQRT_2 / amplitude * dx * weight * (-0.5 * y * y).exp();
            for (m, &h) in hpoly.iter().enumerate() {
                for (b, &value) in bspl[..=degree].iter().enumerate() {
                    result[[m, left + b]] += mult * h * value;
                }
            }
        }
    }
    result
}

/// Builds the B-spline to Gauss-Hermite matrix for spline degree `degree` over the
/// breakpoints `grid`. Only degrees 0 to 3 are supported.
pub fn compute_gauss_hermite_matrix(
    degree: usize,
    grid: &[f64],
    order: usize,
    envelope: &Envelope,
) -> Result<Array2<f64>, ExpansionError> {
    let degree = SplineDegree::try_from(degree)?;
    let basis = BsplineBasis::new(degree.as_usize(), grid)?;
    let matrix = gauss_hermite_matrix(&basis, order, envelope);
    log::debug!(
        "Gauss-Hermite matrix for {:?} splines: {} x {}",
        degree,
        matrix.nrows(),
        matrix.ncols()
    );
    Ok(matrix)
}

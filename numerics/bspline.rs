use ndarray::{Array1, ArrayView1};
use thiserror::Error;

/// Errors raised while building a B-spline basis from a breakpoint grid.
#[derive(Error, Debug)]
pub enum BasisError {
    #[error("B-spline degree {0} is not supported.")]
    InvalidDegree(usize),

    #[error("A B-spline grid needs at least two breakpoints, but {len} were given.")]
    GridTooShort { len: usize },

    #[error("B-spline grid must be strictly increasing and finite (violated at index {index}).")]
    GridNotIncreasing { index: usize },
}

/// Largest spline degree the basis evaluator handles.
pub const MAX_DEGREE: usize = 3;

/// B-spline basis of a fixed degree over an ordered grid of breakpoints.
///
/// The end breakpoints are repeated `degree + 1` times in the knot vector, so the
/// basis has `grid.len() + degree - 1` functions and sums to one everywhere on
/// the grid.
#[derive(Debug, Clone)]
pub struct BsplineBasis {
    degree: usize,
    grid: Array1<f64>,
    knots: Array1<f64>,
}

impl BsplineBasis {
    pub fn new(degree: usize, grid: &[f64]) -> Result<Self, BasisError> {
        if degree > MAX_DEGREE {
            return Err(BasisError::InvalidDegree(degree));
        }
        if grid.len() < 2 {
            return Err(BasisError::GridTooShort { len: grid.len() });
        }
        if let Some(index) = grid
            .iter()
            .enumerate()
            .position(|(i, &x)| !x.is_finite() || (i > 0 && x <= grid[i - 1]))
        {
            return Err(BasisError::GridNotIncreasing { index });
        }

        let grid = Array1::from(grid.to_vec());
        let knots = internal::clamped_knot_vector(grid.view(), degree);
        Ok(Self {
            degree,
            grid,
            knots,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Breakpoints of the grid (without repeated end knots).
    pub fn grid(&self) -> ArrayView1<'_, f64> {
        self.grid.view()
    }

    /// Number of basis functions.
    pub fn num_functions(&self) -> usize {
        self.knots.len() - self.degree - 1
    }

    /// Evaluates the `degree + 1` basis functions that may be nonzero at `x`,
    /// writing them into `out[..=degree]`, and returns the index of the leftmost one.
    /// Outside the grid the values are all zero.
    pub fn nonzero_components(&self, x: f64, out: &mut [f64]) -> usize {
        let values = &mut out[..=self.degree];
        let first = self.grid[0];
        let last = self.grid[self.grid.len() - 1];
        let span = self.find_span(x);
        if !(first..=last).contains(&x) {
            values.fill(0.0);
        } else {
            internal::cox_de_boor(x, self.degree, span, self.knots.view(), values);
        }
        span - self.degree
    }

    /// Evaluates `Σ_j amplitudes[j] B_j(x)`.
    pub fn evaluate(&self, x: f64, amplitudes: ArrayView1<f64>) -> f64 {
        let mut values = [0.0; MAX_DEGREE + 1];
        let left = self.nonzero_components(x, &mut values);
        values[..=self.degree]
            .iter()
            .enumerate()
            .map(|(b, v)| v * amplitudes[left + b])
            .sum()
    }

    /// Knot interval `mu` with `knots[mu] <= x < knots[mu + 1]`, clamped so that the
    /// right end of the grid belongs to the last interval.
    fn find_span(&self, x: f64) -> usize {
        let last_span = self.num_functions() - 1;
        match self.knots.iter().rposition(|&k| k <= x) {
            Some(pos) => pos.clamp(self.degree, last_span),
            None => self.degree,
        }
    }
}

mod internal {
    use super::*;

    /// Repeats the end breakpoints so the basis is clamped at both ends.
    pub(super) fn clamped_knot_vector(grid: ArrayView1<f64>, degree: usize) -> Array1<f64> {
        let first = grid[0];
        let last = grid[grid.len() - 1];
        std::iter::repeat_n(first, degree)
            .chain(grid.iter().copied())
            .chain(std::iter::repeat_n(last, degree))
            .collect()
    }

    /// Evaluates the nonzero B-splines of `degree` on knot interval `span` with the
    /// triangular Cox-de Boor scheme. `values[i]` receives `B_{span - degree + i}(x)`.
    pub(super) fn cox_de_boor(
        x: f64,
        degree: usize,
        span: usize,
        knots: ArrayView1<f64>,
        values: &mut [f64],
    ) {
        let mut left = [0.0; MAX_DEGREE + 1];
        let mut right = [0.0; MAX_DEGREE + 1];
        values[0] = 1.0;
        for j in 1..=degree {
            left[j] = x - knots[span + 1 - j];
            right[j] = knots[span + j] - x;
            let mut saved = 0.0;
            for r in 0..j {
                let denom = right[r + 1] + left[j - r];
                let temp = if denom > 0.0 { values[r] / denom } else { 0.0 };
                values[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            values[j] = saved;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn number_of_functions_follows_grid_and_degree() {
        let grid = [0.0, 1.0, 2.5, 4.0];
        for degree in 0..=MAX_DEGREE {
            let basis = BsplineBasis::new(degree, &grid).unwrap();
            assert_eq!(basis.num_functions(), grid.len() + degree - 1);
        }
    }

    #[test]
    fn basis_sums_to_one_on_the_grid() {
        let grid: Vec<f64> = (0..=8).map(|i| -2.0 + 0.5 * i as f64).collect();
        for degree in 0..=MAX_DEGREE {
            let basis = BsplineBasis::new(degree, &grid).unwrap();
            for x in Array::linspace(-2.0, 2.0, 97).iter() {
                let mut values = [0.0; MAX_DEGREE + 1];
                let left = basis.nonzero_components(*x, &mut values);
                assert!(left + degree < basis.num_functions());
                let sum: f64 = values[..=degree].iter().sum();
                assert!(
                    (sum - 1.0).abs() < 1e-12,
                    "degree {degree}: basis did not sum to 1 at {x}, got {sum}"
                );
                assert!(values[..=degree].iter().all(|v| *v >= -1e-15));
            }
        }
    }

    #[test]
    fn linear_splines_interpolate_breakpoints() {
        // Degree 1 on grid [0, 1, 2]: hat functions centered on each breakpoint.
        let basis = BsplineBasis::new(1, &[0.0, 1.0, 2.0]).unwrap();
        let amplitudes = Array1::from(vec![3.0, -1.0, 2.0]);
        assert!((basis.evaluate(0.0, amplitudes.view()) - 3.0).abs() < 1e-12);
        assert!((basis.evaluate(1.0, amplitudes.view()) + 1.0).abs() < 1e-12);
        assert!((basis.evaluate(2.0, amplitudes.view()) - 2.0).abs() < 1e-12);
        assert!((basis.evaluate(0.5, amplitudes.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn values_vanish_outside_the_grid() {
        let basis = BsplineBasis::new(3, &[0.0, 1.0, 2.0, 3.0]).unwrap();
        let amplitudes = Array1::ones(basis.num_functions());
        assert_eq!(basis.evaluate(-0.1, amplitudes.view()), 0.0);
        assert_eq!(basis.evaluate(3.1, amplitudes.view()), 0.0);
    }

    #[test]
    fn error_conditions() {
        match BsplineBasis::new(4, &[0.0, 1.0]).unwrap_err() {
            BasisError::InvalidDegree(degree) => assert_eq!(degree, 4),
            other => panic!("Expected InvalidDegree error, got {other:?}"),
        }
        match BsplineBasis::new(1, &[0.0]).unwrap_err() {
            BasisError::GridTooShort { len } => assert_eq!(len, 1),
            other => panic!("Expected GridTooShort error, got {other:?}"),
        }
        match BsplineBasis::new(1, &[0.0, 1.0, 1.0]).unwrap_err() {
            BasisError::GridNotIncreasing { index } => assert_eq!(index, 2),
            other => panic!("Expected GridNotIncreasing error, got {other:?}"),
        }
    }
}

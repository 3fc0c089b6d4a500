//! Globally adaptive Gauss-Kronrod integration of vector-valued integrands.
//!
//! The 15-point Kronrod rule is paired with its embedded 7-point Gauss rule; the
//! difference between the two is the per-segment error estimate. The segment with
//! the largest error is bisected until the summed error meets the relative
//! tolerance or the evaluation budget would be exceeded.

use ndarray::Array1;

/// Kronrod abscissae on [-1, 1], non-negative half, descending.
/// Odd indices are shared with the 7-point Gauss rule.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];

/// Gauss weights for the abscissae XGK[1], XGK[3], XGK[5], XGK[7].
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

const EVALS_PER_SEGMENT: usize = 15;

/// Outcome of an adaptive integration.
#[derive(Debug, Clone)]
pub struct AdaptiveIntegral {
    /// Integral of each component of the integrand.
    pub values: Array1<f64>,
    /// Summed error estimate (Euclidean norm over components).
    pub error: f64,
    /// Number of integrand calls made.
    pub evaluations: usize,
    /// Whether the tolerance was met within the budget.
    pub converged: bool,
}

struct Segment {
    lower: f64,
    upper: f64,
    values: Vec<f64>,
    error: f64,
}

fn kronrod_segment<F>(f: &F, lower: f64, upper: f64, num_values: usize) -> Segment
where
    F: Fn(f64, &mut [f64]),
{
    let center = 0.5 * (lower + upper);
    let half = 0.5 * (upper - lower);
    let mut kronrod = vec![0.0; num_values];
    let mut gauss = vec![0.0; num_values];
    let mut left = vec![0.0; num_values];
    let mut right = vec![0.0; num_values];

    f(center, &mut left);
    for v in 0..num_values {
        kronrod[v] = WGK[7] * left[v];
        gauss[v] = WG[3] * left[v];
    }

    for k in 0..7 {
        let offset = half * XGK[k];
        f(center - offset, &mut left);
        f(center + offset, &mut right);
        for v in 0..num_values {
            let pair = left[v] + right[v];
            kronrod[v] += WGK[k] * pair;
            if k % 2 == 1 {
                gauss[v] += WG[k / 2] * pair;
            }
        }
    }

    let mut error_sq = 0.0;
    for v in 0..num_values {
        kronrod[v] *= half;
        gauss[v] *= half;
        error_sq += (kronrod[v] - gauss[v]).powi(2);
    }

    Segment {
        lower,
        upper,
        values: kronrod,
        error: error_sq.sqrt(),
    }
}

/// Integrates the `num_values`-component function `f(x, out)` over `[lower, upper]`.
///
/// Segments are bisected until `error <= rel_tolerance * |integral|` (Euclidean
/// norms) or until the next bisection would exceed `max_evaluations`. The first
/// segment is always evaluated, even if the budget is smaller than one rule.
pub fn integrate_adaptive<F>(
    f: F,
    lower: f64,
    upper: f64,
    num_values: usize,
    rel_tolerance: f64,
    max_evaluations: usize,
) -> AdaptiveIntegral
where
    F: Fn(f64, &mut [f64]),
{
    let mut segments = vec![kronrod_segment(&f, lower, upper, num_values)];
    let mut evaluations = EVALS_PER_SEGMENT;

    let (values, error, converged) = loop {
        let mut total = Array1::<f64>::zeros(num_values);
        let mut error = 0.0;
        for segment in &segments {
            for (t, &v) in total.iter_mut().zip(segment.values.iter()) {
                *t += v;
            }
            error += segment.error;
        }
        let magnitude = total.dot(&total).sqrt();

        if error <= rel_tolerance * magnitude {
            break (total, error, true);
        }
        if !error.is_finite() || evaluations + 2 * EVALS_PER_SEGMENT > max_evaluations {
            break (total, error, false);
        }

        let worst = segments
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.error.total_cmp(&b.1.error))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let split = segments.swap_remove(worst);
        let midpoint = 0.5 * (split.lower + split.upper);
        segments.push(kronrod_segment(&f, split.lower, midpoint, num_values));
        segments.push(kronrod_segment(&f, midpoint, split.upper, num_values));
        evaluations += 2 * EVALS_PER_SEGMENT;
    };

    log::trace!(
        "Adaptive integration finished: {} segments, {} evaluations, error {:.3e}",
        segments.len(),
        evaluations,
        error
    );

    AdaptiveIntegral {
        values,
        error,
        evaluations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn polynomial_is_exact_on_first_segment() {
        let result = integrate_adaptive(
            |x, out: &mut [f64]| {
                out[0] = 1.0;
                out[1] = x * x * x * x;
            },
            0.0,
            2.0,
            2,
            1e-10,
            1000,
        );
        assert!(result.converged);
        assert_eq!(result.evaluations, 15);
        assert_relative_eq!(result.values[0], 2.0, epsilon = 1e-13);
        assert_relative_eq!(result.values[1], 32.0 / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn peaked_integrand_needs_bisection() {
        // ∫_0^1 1/(1e-4 + (x - 0.3)^2) dx = 100 (atan(70) + atan(30))
        let expected = 100.0 * (70.0_f64.atan() + 30.0_f64.atan());
        let result = integrate_adaptive(
            |x, out: &mut [f64]| out[0] = 1.0 / (1e-4 + (x - 0.3).powi(2)),
            0.0,
            1.0,
            1,
            1e-6,
            5000,
        );
        assert!(result.converged);
        assert!(result.evaluations > 15);
        assert_relative_eq!(result.values[0], expected, max_relative = 1e-6);
    }

    #[test]
    fn budget_stops_refinement() {
        let result = integrate_adaptive(
            |x, out: &mut [f64]| out[0] = 1.0 / (1e-8 + (x - 0.3).powi(2)),
            0.0,
            1.0,
            1,
            1e-12,
            100,
        );
        assert!(!result.converged);
        assert!(result.evaluations <= 100);
    }

    #[test]
    fn zero_integrand_converges_immediately() {
        let result = integrate_adaptive(|_, out: &mut [f64]| out.fill(0.0), 0.0, 1.0, 3, 1e-3, 1000);
        assert!(result.converged);
        assert_eq!(result.values, Array1::<f64>::zeros(3));
    }
}

//! Gauss-Legendre quadrature rules on the unit interval.
//!
//! Rules are built once per node count by Newton iteration on the Legendre
//! three-term recurrence and then shared read-only for the lifetime of the process.

use ndarray::Array1;
use std::f64::consts::PI;
use std::sync::OnceLock;

/// Largest node count for which a rule is tabulated.
pub const MAX_GL_NODES: usize = 20;

/// Nodes and weights of an n-point Gauss-Legendre rule mapped onto [0, 1].
/// The weights sum to one, so a segment integral is `dx * Σ w_k f(x1 + dx * t_k)`.
#[derive(Debug, Clone)]
pub struct GaussLegendreRule {
    pub nodes: Array1<f64>,
    pub weights: Array1<f64>,
}

impl GaussLegendreRule {
    /// Computes the rule with `n` nodes (`n >= 1`).
    pub fn compute(n: usize) -> Self {
        let n = n.max(1);
        let mut nodes = Array1::zeros(n);
        let mut weights = Array1::zeros(n);
        let half = n.div_ceil(2);

        for i in 0..half {
            // Initial guess for the i-th largest root on [-1, 1].
            let mut z = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
            let mut derivative = 1.0;
            for _ in 0..100 {
                let (p_n, p_nm1) = legendre_pair(n, z);
                derivative = n as f64 * (z * p_n - p_nm1) / (z * z - 1.0);
                let previous = z;
                z = previous - p_n / derivative;
                if (z - previous).abs() < 1e-15 {
                    let (p_n, p_nm1) = legendre_pair(n, z);
                    derivative = n as f64 * (z * p_n - p_nm1) / (z * z - 1.0);
                    break;
                }
            }
            let w = 2.0 / ((1.0 - z * z) * derivative * derivative);

            // Map from [-1, 1] to [0, 1]; ascending order.
            nodes[i] = 0.5 * (1.0 - z);
            nodes[n - 1 - i] = 0.5 * (1.0 + z);
            weights[i] = 0.5 * w;
            weights[n - 1 - i] = 0.5 * w;
        }

        Self { nodes, weights }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Returns `(P_n(z), P_{n-1}(z))`.
fn legendre_pair(n: usize, z: f64) -> (f64, f64) {
    let mut p1 = 1.0;
    let mut p2 = 0.0;
    for j in 0..n {
        let p3 = p2;
        p2 = p1;
        p1 = ((2.0 * j as f64 + 1.0) * z * p2 - j as f64 * p3) / (j as f64 + 1.0);
    }
    (p1, p2)
}

/// Shared rule with `n` nodes, clamped to `1..=MAX_GL_NODES`.
pub fn gauss_legendre(n: usize) -> &'static GaussLegendreRule {
    static TABLES: OnceLock<Vec<GaussLegendreRule>> = OnceLock::new();
    let tables = TABLES.get_or_init(|| {
        (1..=MAX_GL_NODES)
            .map(GaussLegendreRule::compute)
            .collect()
    });
    &tables[n.clamp(1, MAX_GL_NODES) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weights_sum_to_one() {
        for n in 1..=MAX_GL_NODES {
            let rule = gauss_legendre(n);
            assert_eq!(rule.len(), n);
            assert_abs_diff_eq!(rule.weights.sum(), 1.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn nodes_are_ascending_and_symmetric() {
        let rule = gauss_legendre(7);
        for k in 1..rule.len() {
            assert!(rule.nodes[k] > rule.nodes[k - 1]);
        }
        for k in 0..rule.len() {
            assert_abs_diff_eq!(rule.nodes[k] + rule.nodes[6 - k], 1.0, epsilon = 1e-14);
        }
        assert_abs_diff_eq!(rule.nodes[3], 0.5, epsilon = 1e-14);
    }

    #[test]
    fn exact_for_polynomials_up_to_degree_2n_minus_1() {
        // n = 4 integrates t^7 exactly: ∫_0^1 t^7 dt = 1/8.
        let rule = gauss_legendre(4);
        let integral: f64 = rule
            .nodes
            .iter()
            .zip(rule.weights.iter())
            .map(|(&t, &w)| w * t.powi(7))
            .sum();
        assert_abs_diff_eq!(integral, 0.125, epsilon = 1e-14);
    }

    #[test]
    fn out_of_range_counts_are_clamped() {
        assert_eq!(gauss_legendre(0).len(), 1);
        assert_eq!(gauss_legendre(100).len(), MAX_GL_NODES);
    }
}

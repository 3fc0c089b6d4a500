//! Levenberg-Marquardt minimization of a sum of squared residuals with an
//! analytic Jacobian.

use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1, ArrayViewMut2};
use ndarray_linalg::Solve;

const INITIAL_DAMPING: f64 = 1e-3;
const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e16;

/// A nonlinear least-squares problem: residuals `r_p(params)` and their partial
/// derivatives `∂r_p/∂params_k`.
pub trait LeastSquaresModel {
    fn num_params(&self) -> usize;

    fn num_residuals(&self) -> usize;

    /// Fills `residuals` (length `num_residuals`) and, when requested, `jacobian`
    /// with shape `[num_residuals, num_params]`.
    fn evaluate(
        &self,
        params: ArrayView1<f64>,
        residuals: ArrayViewMut1<f64>,
        jacobian: Option<ArrayViewMut2<f64>>,
    );
}

/// Result of a Levenberg-Marquardt run. `params` are always the best point
/// found, whether or not the run converged.
#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: Array1<f64>,
    /// Half the sum of squared residuals at `params`.
    pub cost: f64,
    pub evaluations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct LevenbergMarquardt {
    /// Relative tolerance on every component of an accepted step:
    /// `|dx_k| <= accuracy (|x_k| + accuracy)`.
    pub accuracy: f64,
    /// Upper bound on model evaluations (each evaluation fills residuals and Jacobian).
    pub max_evaluations: usize,
}

impl LevenbergMarquardt {
    pub fn new(accuracy: f64, max_evaluations: usize) -> Self {
        Self {
            accuracy,
            max_evaluations,
        }
    }

    pub fn minimize<M: LeastSquaresModel>(&self, model: &M, init: ArrayView1<f64>) -> LmSolution {
        let num_params = model.num_params();
        let num_residuals = model.num_residuals();

        let mut params = init.to_owned();
        let mut residuals = Array1::<f64>::zeros(num_residuals);
        let mut jacobian = Array2::<f64>::zeros((num_residuals, num_params));
        model.evaluate(params.view(), residuals.view_mut(), Some(jacobian.view_mut()));
        let mut evaluations = 1;
        let mut cost = 0.5 * residuals.dot(&residuals);

        if !cost.is_finite() {
            log::warn!("Levenberg-Marquardt: non-finite residuals at the starting point");
            return LmSolution {
                params,
                cost,
                evaluations,
                converged: false,
            };
        }

        let mut trial_residuals = Array1::<f64>::zeros(num_residuals);
        let mut trial_jacobian = Array2::<f64>::zeros((num_residuals, num_params));
        let mut damping = INITIAL_DAMPING;
        let mut converged = false;

        'outer: while evaluations < self.max_evaluations {
            let normal = jacobian.t().dot(&jacobian);
            let gradient = jacobian.t().dot(&residuals);
            if cost == 0.0 || gradient.iter().all(|g| *g == 0.0) {
                converged = true;
                break;
            }

            loop {
                if evaluations >= self.max_evaluations {
                    break 'outer;
                }
                if damping > MAX_DAMPING {
                    log::warn!(
                        "Levenberg-Marquardt: damping saturated after {} evaluations (cost {:.6e})",
                        evaluations,
                        cost
                    );
                    break 'outer;
                }

                // Marquardt scaling; the floor is relative to the largest curvature.
                let max_diagonal = normal.diag().fold(0.0_f64, |acc, d| acc.max(*d));
                let floor = if max_diagonal > 0.0 {
                    MIN_DAMPING * max_diagonal
                } else {
                    1.0
                };
                let mut damped = normal.clone();
                for k in 0..num_params {
                    damped[[k, k]] += damping * normal[[k, k]].max(floor);
                }
                let step = match damped.solve(&gradient.mapv(|g| -g)) {
                    Ok(step) if step.iter().all(|s| s.is_finite()) => step,
                    _ => {
                        damping *= 10.0;
                        continue;
                    }
                };

                let trial = &params + &step;
                model.evaluate(
                    trial.view(),
                    trial_residuals.view_mut(),
                    Some(trial_jacobian.view_mut()),
                );
                evaluations += 1;
                let trial_cost = 0.5 * trial_residuals.dot(&trial_residuals);

                if trial_cost.is_finite() && trial_cost <= cost {
                    let step_norm = step.dot(&step).sqrt();
                    let small_step = step
                        .iter()
                        .zip(trial.iter())
                        .all(|(dx, x)| dx.abs() <= self.accuracy * (x.abs() + self.accuracy));

                    params = trial;
                    std::mem::swap(&mut residuals, &mut trial_residuals);
                    std::mem::swap(&mut jacobian, &mut trial_jacobian);
                    cost = trial_cost;
                    damping = (damping / 10.0).max(MIN_DAMPING);

                    log::trace!(
                        "Levenberg-Marquardt eval {}: cost {:.6e}, step {:.3e}, damping {:.1e}",
                        evaluations,
                        cost,
                        step_norm,
                        damping
                    );

                    if small_step {
                        converged = true;
                        break 'outer;
                    }
                    break;
                }
                damping *= 10.0;
            }
        }

        LmSolution {
            params,
            cost,
            evaluations,
            converged,
        }
    }
}

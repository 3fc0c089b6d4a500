use crate::config::ExpansionConfig;
use crate::fitter::EnvelopeFitter;
use crate::hermite::hermite_into;
use crate::moments::{ClassicMoments, estimate_moments};
use crate::numerics::bspline::BasisError;
use crate::numerics::levmar::LevenbergMarquardt;
use crate::projector::project_coefficients;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use thiserror::Error;

/// Errors raised while building expansions, transform matrices or configurations.
#[derive(Error, Debug)]
pub enum ExpansionError {
    #[error("Gauss-Hermite expansion order must be at least 2, but was {order}.")]
    InvalidOrder { order: usize },

    #[error("B-spline degree must be 0, 1, 2 or 3, but was {0}.")]
    UnsupportedSplineDegree(usize),

    #[error("An expansion needs at least 3 coefficients (h_0, h_1, h_2), but {len} were given.")]
    InvalidCoefficients { len: usize },

    #[error("Failed to build the B-spline basis: {0}")]
    Basis(#[from] BasisError),

    #[error("Failed to read or write configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration to TOML: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Amplitude, center and width of the base Gaussian
/// `amplitude / (width √(2π)) exp(-(x - center)² / (2 width²))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub amplitude: f64,
    pub center: f64,
    pub width: f64,
}

impl Envelope {
    pub fn new(amplitude: f64, center: f64, width: f64) -> Self {
        Self {
            amplitude,
            center,
            width,
        }
    }

    /// An envelope whose parameters are all finite. Anything else (typically NaN
    /// placeholders) asks the expansion to estimate the envelope itself.
    pub fn is_specified(&self) -> bool {
        (self.amplitude + self.center + self.width).is_finite()
    }

    /// Value of the base Gaussian at `x`.
    pub fn gaussian(&self, x: f64) -> f64 {
        let y = (x - self.center) / self.width;
        FRAC_1_SQRT_2 / PI.sqrt() * self.amplitude / self.width * (-0.5 * y * y).exp()
    }
}

/// How the envelope of an expansion was obtained when it was fitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    /// Moments used as the starting point.
    pub seed: ClassicMoments,
    /// Levenberg-Marquardt model evaluations (0 when the fit was skipped).
    pub evaluations: usize,
    /// Half the sum of squared residuals at the returned envelope.
    pub cost: f64,
    /// False if the fit hit its budget, was skipped, or ended at a non-positive width.
    pub converged: bool,
}

/// A Gauss-Hermite expansion `f(x) ≈ A/(w√(2π)) exp(-y²/2) Σ_n h_n H_n(y)`,
/// `y = (x - c)/w`. Immutable once built.
#[derive(Debug, Clone)]
pub struct GaussHermiteExpansion {
    envelope: Envelope,
    coefficients: Array1<f64>,
    fit_report: Option<FitReport>,
}

impl GaussHermiteExpansion {
    /// Expands `fnc` to the given `order` (at least 2).
    ///
    /// With `Some` finite envelope the coefficients are projected directly. With
    /// `None`, or an envelope containing non-finite values, the envelope is first
    /// seeded from the classic moments of `fnc` and refined by a Levenberg-Marquardt
    /// fit following `config.fit_policy`.
    pub fn new<F>(
        fnc: &F,
        order: usize,
        envelope: Option<Envelope>,
        config: &ExpansionConfig,
    ) -> Result<Self, ExpansionError>
    where
        F: Fn(f64) -> f64,
    {
        if order < 2 {
            return Err(ExpansionError::InvalidOrder { order });
        }

        let (envelope, fit_report) = match envelope.filter(Envelope::is_specified) {
            Some(envelope) => (envelope, None),
            None => {
                let (envelope, report) = fit_envelope(fnc, order, config);
                (envelope, Some(report))
            }
        };

        let coefficients = if fit_report.is_some_and(|r| r.seed.is_degenerate()) {
            Array1::zeros(order + 1)
        } else {
            project_coefficients(fnc, order, &envelope)
        };

        Ok(Self {
            envelope,
            coefficients,
            fit_report,
        })
    }

    /// Fits the envelope with the default configuration and expands `fnc` to `order`.
    pub fn fit<F>(fnc: &F, order: usize) -> Result<Self, ExpansionError>
    where
        F: Fn(f64) -> f64,
    {
        Self::new(fnc, order, None, &ExpansionConfig::default())
    }

    /// Assembles an expansion from a known envelope and coefficients `h_0 .. h_order`.
    pub fn from_coefficients(
        envelope: Envelope,
        coefficients: Array1<f64>,
    ) -> Result<Self, ExpansionError> {
        if coefficients.len() < 3 {
            return Err(ExpansionError::InvalidCoefficients {
                len: coefficients.len(),
            });
        }
        Ok(Self {
            envelope,
            coefficients,
            fit_report: None,
        })
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }

    pub fn amplitude(&self) -> f64 {
        self.envelope.amplitude
    }

    pub fn center(&self) -> f64 {
        self.envelope.center
    }

    pub fn width(&self) -> f64 {
        self.envelope.width
    }

    /// Highest Hermite degree of the expansion.
    pub fn order(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    /// Present only when the envelope was fitted rather than supplied.
    pub fn fit_report(&self) -> Option<&FitReport> {
        self.fit_report.as_ref()
    }

    /// Evaluates the expansion at `x`.
    pub fn value(&self, x: f64) -> f64 {
        let ncoefs = self.coefficients.len();
        if ncoefs == 0 {
            return 0.0;
        }
        let Envelope {
            amplitude,
            center,
            width,
        } = self.envelope;
        let xscaled = (x - center) / width;
        let norm = (FRAC_1_SQRT_2 / PI.sqrt()) * amplitude / width * (-0.5 * xscaled * xscaled).exp();
        let mut hpoly = vec![0.0; ncoefs];
        hermite_into(xscaled, &mut hpoly);
        let sum: f64 = self
            .coefficients
            .iter()
            .zip(hpoly.iter())
            .map(|(c, h)| c * h)
            .sum();
        sum * norm
    }

    /// `∫ H_n(y) exp(-y²/2) dy / √(2π)`: `√(n!) / n!!` for even `n`, zero for odd `n`.
    pub fn normn(n: usize) -> f64 {
        if n % 2 == 1 {
            return 0.0;
        }
        match n {
            0 => 1.0,
            2 => FRAC_1_SQRT_2,
            4 => 0.612_372_435_695_794_5,
            6 => 0.559_016_994_374_947_4,
            8 => 0.522_912_516_583_797_2,
            // √(n!) / n!! = Π_{k=1}^{n/2} √((2k - 1) / (2k))
            _ => (1..=n / 2)
                .map(|k| ((2 * k - 1) as f64 / (2 * k) as f64).sqrt())
                .product(),
        }
    }

    /// Integral of the expansion over the real line, `A Σ_{even n} h_n normn(n)`.
    pub fn norm(&self) -> f64 {
        let sum: f64 = self
            .coefficients
            .iter()
            .enumerate()
            .step_by(2)
            .map(|(n, h)| h * Self::normn(n))
            .sum();
        sum * self.envelope.amplitude
    }
}

/// Seeds the envelope from the classic moments and refines it by least squares.
fn fit_envelope<F>(fnc: &F, order: usize, config: &ExpansionConfig) -> (Envelope, FitReport)
where
    F: Fn(f64) -> f64,
{
    let seed = estimate_moments(fnc, config);
    if seed.is_degenerate() {
        log::warn!(
            "Cannot seed a Gaussian envelope (total={:.3e}, dispersion={:.3e}); coefficients set to zero",
            seed.total,
            seed.dispersion
        );
        let center = if seed.mean.is_finite() { seed.mean } else { 0.0 };
        let report = FitReport {
            seed,
            evaluations: 0,
            cost: 0.0,
            converged: false,
        };
        return (Envelope::new(0.0, center, 1.0), report);
    }

    // The default policy fits only the Gaussian so that the envelope, and with it
    // every lower coefficient, stays the same whatever the expansion order.
    let fitter = EnvelopeFitter::new(config.fit_policy.fit_order(order), fnc);
    let mut init = Array1::zeros(fitter.fit_order() + 1);
    init[0] = seed.total;
    init[1] = seed.mean;
    init[2] = seed.dispersion;

    let solver = LevenbergMarquardt::new(config.fit_accuracy, config.fit_max_evaluations);
    let solution = solver.minimize(&fitter, init.view());
    let envelope = Envelope::new(solution.params[0], solution.params[1], solution.params[2]);
    let width_ok = envelope.width > 0.0 && envelope.width.is_finite();
    let converged = solution.converged && width_ok && envelope.is_specified();

    if converged {
        log::debug!(
            "Envelope fit: amplitude={:.6e}, center={:.6e}, width={:.6e} after {} evaluations",
            envelope.amplitude,
            envelope.center,
            envelope.width,
            solution.evaluations
        );
    } else {
        log::warn!(
            "Envelope fit did not converge after {} evaluations (amplitude={:.3e}, center={:.3e}, width={:.3e})",
            solution.evaluations,
            envelope.amplitude,
            envelope.center,
            envelope.width
        );
    }

    let report = FitReport {
        seed,
        evaluations: solution.evaluations,
        cost: solution.cost,
        converged,
    };
    (envelope, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::SQRT_2;

    #[test]
    fn normn_closed_forms() {
        assert_eq!(GaussHermiteExpansion::normn(0), 1.0);
        assert_eq!(GaussHermiteExpansion::normn(1), 0.0);
        assert_relative_eq!(GaussHermiteExpansion::normn(2), 1.0 / SQRT_2, epsilon = 1e-15);
        assert_relative_eq!(GaussHermiteExpansion::normn(4), 6.0_f64.sqrt() / 4.0, epsilon = 1e-15);
        assert_relative_eq!(GaussHermiteExpansion::normn(6), 5.0_f64.sqrt() / 4.0, epsilon = 1e-15);
        assert_relative_eq!(GaussHermiteExpansion::normn(8), 70.0_f64.sqrt() / 16.0, epsilon = 1e-15);
        for n in (1..40).step_by(2) {
            assert_eq!(GaussHermiteExpansion::normn(n), 0.0);
        }
    }

    #[test]
    fn normn_general_formula_continues_the_table() {
        // √(10!) / 10!! = √3628800 / 3840
        assert_relative_eq!(
            GaussHermiteExpansion::normn(10),
            3_628_800.0_f64.sqrt() / 3840.0,
            max_relative = 1e-14
        );
        // The product form reproduces the tabulated values.
        for n in [4usize, 6, 8] {
            let product: f64 = (1..=n / 2)
                .map(|k| ((2 * k - 1) as f64 / (2 * k) as f64).sqrt())
                .product();
            assert_relative_eq!(product, GaussHermiteExpansion::normn(n), max_relative = 1e-14);
        }
        assert!(GaussHermiteExpansion::normn(400).is_finite());
    }

    #[test]
    fn order_below_two_is_rejected() {
        let f = |x: f64| (-x * x).exp();
        for order in [0, 1] {
            match GaussHermiteExpansion::fit(&f, order) {
                Err(ExpansionError::InvalidOrder { order: got }) => assert_eq!(got, order),
                other => panic!("Expected InvalidOrder error, got {other:?}"),
            }
        }
    }

    #[test]
    fn explicit_coefficients_need_three_entries() {
        let envelope = Envelope::new(1.0, 0.0, 1.0);
        assert!(matches!(
            GaussHermiteExpansion::from_coefficients(envelope, Array1::from(vec![1.0, 0.0])),
            Err(ExpansionError::InvalidCoefficients { len: 2 })
        ));
    }

    #[test]
    fn peak_of_an_unmodified_gaussian() {
        let envelope = Envelope::new(2.5, 0.7, 1.8);
        let expansion =
            GaussHermiteExpansion::from_coefficients(envelope, Array1::from(vec![1.0, 0.0, 0.0, 0.0]))
                .unwrap();
        assert_relative_eq!(
            expansion.value(0.7),
            2.5 / (1.8 * (2.0 * PI).sqrt()),
            max_relative = 1e-14
        );
        assert_relative_eq!(expansion.norm(), 2.5, max_relative = 1e-15);
        assert_eq!(expansion.order(), 3);
    }

    #[test]
    fn unspecified_sentinel() {
        assert!(Envelope::new(1.0, 0.0, 1.0).is_specified());
        assert!(!Envelope::new(f64::NAN, 0.0, 1.0).is_specified());
        assert!(!Envelope::new(1.0, f64::INFINITY, 1.0).is_specified());
    }
}

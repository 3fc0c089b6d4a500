use crate::model::ExpansionError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Which parameters the envelope fit adjusts.
///
/// `GaussianOnly` fits amplitude, center and width with `h_0 = 1`, `h_1 = h_2 = 0`
/// and no higher terms. The resulting Gaussian does not depend on the expansion
/// order, and projecting onto it yields `h_1 ≈ h_2 ≈ 0`.
///
/// `FullOrder` fits amplitude, center, width and `h_3 .. h_order` jointly (still
/// with `h_1 = h_2 = 0`). The fitted center and width then depend on the order,
/// and the projected `h_1`, `h_2` come out nonzero. The auxiliary coefficients
/// only shape the fit; the stored coefficients are always re-projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EnvelopeFitPolicy {
    #[default]
    GaussianOnly,
    FullOrder,
}

impl EnvelopeFitPolicy {
    /// Highest Gauss-Hermite degree included in the fitted model.
    pub fn fit_order(self, order: usize) -> usize {
        match self {
            EnvelopeFitPolicy::GaussianOnly => 2,
            EnvelopeFitPolicy::FullOrder => order.max(2),
        }
    }
}

/// Tolerances and budgets for envelope estimation. Serialized as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Relative accuracy of the adaptive moment integral.
    pub moments_rel_tolerance: f64,
    /// Evaluation budget of the moment integral.
    pub moments_max_evaluations: usize,
    /// Convergence accuracy of the Levenberg-Marquardt envelope fit.
    pub fit_accuracy: f64,
    /// Evaluation budget of the envelope fit.
    pub fit_max_evaluations: usize,
    pub fit_policy: EnvelopeFitPolicy,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            moments_rel_tolerance: 1e-3,
            moments_max_evaluations: 1000,
            fit_accuracy: 1e-6,
            fit_max_evaluations: 100,
            fit_policy: EnvelopeFitPolicy::GaussianOnly,
        }
    }
}

impl ExpansionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ExpansionError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ExpansionError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads a configuration from a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExpansionError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExpansionError> {
        let text = self.to_toml_string()?;
        let mut writer = BufWriter::new(fs::File::create(path)?);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

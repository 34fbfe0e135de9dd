//! YAML model descriptions consumed by the CLI.

use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use smc_core::errors::{ErrorInfo, SmcError};
use smc_core::{IndependentPrior, Model, Prior, RngHandle, Simulator};

/// Independent prior plus a likelihood family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// One registry distribution per parameter.
    pub priors: IndependentPrior,
    /// Observation model.
    pub likelihood: LikelihoodSpec,
}

/// Supported observation models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LikelihoodSpec {
    /// Independent `N(theta[mean_index], sigma^2)` observations.
    Gaussian {
        /// Observed data.
        observed: Vec<f64>,
        /// Observation noise standard deviation.
        sigma: f64,
        /// Parameter used as the mean.
        #[serde(default)]
        mean_index: usize,
    },
}

impl ModelSpec {
    /// Parses and validates a YAML model description.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SmcError> {
        let spec: ModelSpec = serde_yaml::from_str(yaml)
            .map_err(|err| SmcError::Serde(ErrorInfo::new("model-parse", err.to_string())))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Loads a YAML model description from disk.
    pub fn load(path: &Path) -> Result<Self, SmcError> {
        let yaml = fs::read_to_string(path).map_err(|err| {
            SmcError::Serde(
                ErrorInfo::new("model-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&yaml).map_err(|err| err.with_context("path", path.display().to_string()))
    }

    /// Checks the prior and the likelihood parameters.
    pub fn validate(&self) -> Result<(), SmcError> {
        self.priors.validate()?;
        match &self.likelihood {
            LikelihoodSpec::Gaussian {
                observed,
                sigma,
                mean_index,
            } => {
                if observed.is_empty() {
                    return Err(SmcError::config(
                        "empty-observations",
                        "the likelihood needs at least one observation",
                        "observed",
                        0,
                    ));
                }
                if !(sigma.is_finite() && *sigma > 0.0) {
                    return Err(SmcError::config(
                        "invalid-sigma",
                        "sigma must be positive and finite",
                        "sigma",
                        sigma,
                    ));
                }
                if *mean_index >= self.priors.dim() {
                    return Err(SmcError::config(
                        "invalid-mean-index",
                        "mean_index must address a parameter",
                        "mean_index",
                        mean_index,
                    )
                    .with_context("dim", self.priors.dim().to_string()));
                }
                Ok(())
            }
        }
    }
}

impl Prior for ModelSpec {
    fn dim(&self) -> usize {
        self.priors.dim()
    }

    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        self.priors.sample_prior(rng)
    }

    fn log_prior(&self, position: &[f64]) -> Result<f64, SmcError> {
        self.priors.log_prior(position)
    }
}

impl Model for ModelSpec {
    fn log_likelihood(&self, position: &[f64]) -> Result<f64, SmcError> {
        match &self.likelihood {
            LikelihoodSpec::Gaussian {
                observed,
                sigma,
                mean_index,
            } => {
                let mu = position[*mean_index];
                let norm = -0.5 * (2.0 * PI * sigma * sigma).ln();
                Ok(observed
                    .iter()
                    .map(|y| norm - 0.5 * ((y - mu) / sigma).powi(2))
                    .sum())
            }
        }
    }
}

impl Simulator for ModelSpec {
    fn simulate(&self, position: &[f64], rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        match &self.likelihood {
            LikelihoodSpec::Gaussian {
                observed,
                sigma,
                mean_index,
            } => {
                let mu = position[*mean_index];
                Ok((0..observed.len())
                    .map(|_| mu + sigma * rng.standard_normal())
                    .collect())
            }
        }
    }

    fn observed(&self) -> &[f64] {
        match &self.likelihood {
            LikelihoodSpec::Gaussian { observed, .. } => observed,
        }
    }
}

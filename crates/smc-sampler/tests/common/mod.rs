#![allow(dead_code)]

use std::f64::consts::PI;

use smc_core::distributions::Normal;
use smc_core::errors::{ErrorInfo, SmcError};
use smc_core::{IndependentPrior, Model, Prior, RngHandle, Simulator};
use smc_sampler::SmcConfig;

/// N(0, 1) prior per dimension, Gaussian likelihood of one observation per dimension.
pub struct GaussianModel {
    pub prior: IndependentPrior,
    pub observed: Vec<f64>,
    pub sigma: f64,
}

impl GaussianModel {
    pub fn standard(dim: usize) -> Self {
        let components = (0..dim)
            .map(|_| Normal::new(0.0, 1.0).unwrap().into())
            .collect();
        Self {
            prior: IndependentPrior::new(components).unwrap(),
            observed: vec![0.0; dim],
            sigma: 1.0,
        }
    }
}

impl Prior for GaussianModel {
    fn dim(&self) -> usize {
        self.prior.dim()
    }

    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        self.prior.sample_prior(rng)
    }

    fn log_prior(&self, position: &[f64]) -> Result<f64, SmcError> {
        self.prior.log_prior(position)
    }
}

impl Model for GaussianModel {
    fn log_likelihood(&self, position: &[f64]) -> Result<f64, SmcError> {
        let norm = -0.5 * (2.0 * PI * self.sigma * self.sigma).ln();
        Ok(position
            .iter()
            .zip(&self.observed)
            .map(|(x, y)| norm - 0.5 * ((x - y) / self.sigma).powi(2))
            .sum())
    }
}

/// Simulates `observed.len()` draws from N(mu, 1).
pub struct GaussianSimulator {
    pub prior: IndependentPrior,
    pub observed: Vec<f64>,
}

impl GaussianSimulator {
    pub fn with_mean_one() -> Self {
        let observed = (0..20).map(|i| if i % 2 == 0 { 0.5 } else { 1.5 }).collect();
        Self {
            prior: IndependentPrior::new(vec![Normal::new(0.0, 1.0).unwrap().into()]).unwrap(),
            observed,
        }
    }
}

impl Prior for GaussianSimulator {
    fn dim(&self) -> usize {
        1
    }

    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        self.prior.sample_prior(rng)
    }

    fn log_prior(&self, position: &[f64]) -> Result<f64, SmcError> {
        self.prior.log_prior(position)
    }
}

impl Simulator for GaussianSimulator {
    fn simulate(&self, position: &[f64], rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        Ok((0..self.observed.len())
            .map(|_| position[0] + rng.standard_normal())
            .collect())
    }

    fn observed(&self) -> &[f64] {
        &self.observed
    }
}

/// Model whose likelihood fails once the position leaves `[-limit, limit]`.
pub struct FailingModel {
    pub inner: GaussianModel,
    pub limit: f64,
}

impl Prior for FailingModel {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        self.inner.sample_prior(rng)
    }

    fn log_prior(&self, position: &[f64]) -> Result<f64, SmcError> {
        self.inner.log_prior(position)
    }
}

impl Model for FailingModel {
    fn log_likelihood(&self, position: &[f64]) -> Result<f64, SmcError> {
        if position[0].abs() > self.limit {
            return Err(SmcError::ModelEvaluation(ErrorInfo::new(
                "solver-diverged",
                "likelihood evaluation failed",
            )));
        }
        self.inner.log_likelihood(position)
    }
}

/// Model that panics on every likelihood call.
pub struct PanickingModel(pub GaussianModel);

impl Prior for PanickingModel {
    fn dim(&self) -> usize {
        self.0.dim()
    }

    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        self.0.sample_prior(rng)
    }

    fn log_prior(&self, position: &[f64]) -> Result<f64, SmcError> {
        self.0.log_prior(position)
    }
}

impl Model for PanickingModel {
    fn log_likelihood(&self, _position: &[f64]) -> Result<f64, SmcError> {
        panic!("likelihood blew up")
    }
}

pub fn small_config(draws: usize, chains: usize, seed: u64) -> SmcConfig {
    SmcConfig {
        draws,
        chains: Some(chains),
        cores: Some(1),
        parallel: false,
        random_seed: Some(smc_sampler::SeedSpec::Single(seed)),
        ..SmcConfig::default()
    }
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    sum / n as f64
}

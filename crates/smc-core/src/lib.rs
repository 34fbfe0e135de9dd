#![deny(missing_docs)]
#![doc = "Core traits and data types for the SMC sampler: errors, seeding and the model contract."]

use serde::{Deserialize, Serialize};

pub mod distributions;
pub mod errors;
pub mod prior;
pub mod rng;
mod special;

pub use distributions::Distribution;
pub use errors::{ErrorInfo, SmcError};
pub use prior::IndependentPrior;
pub use rng::{derive_substream_seed, RngHandle};

/// Log densities of a single point in parameter space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Log prior density at the point.
    pub log_prior: f64,
    /// Log likelihood (or pseudo-likelihood) at the point.
    pub log_likelihood: f64,
}

impl Evaluation {
    /// Evaluation for a point outside the support of the model.
    pub const OUTSIDE: Evaluation = Evaluation {
        log_prior: f64::NEG_INFINITY,
        log_likelihood: f64::NEG_INFINITY,
    };

    /// Replaces `NaN` and `+inf` entries with `-inf` so the point is disfavoured.
    pub fn sanitized(self) -> Self {
        Self {
            log_prior: finite_or_neg_inf(self.log_prior),
            log_likelihood: finite_or_neg_inf(self.log_likelihood),
        }
    }

    /// Returns whether both components are finite.
    pub fn is_finite(&self) -> bool {
        self.log_prior.is_finite() && self.log_likelihood.is_finite()
    }
}

fn finite_or_neg_inf(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::NEG_INFINITY
    }
}

/// Prior side of the model contract.
///
/// Implementations are shared by every worker of a run and must therefore be
/// reentrant.
pub trait Prior: Send + Sync {
    /// Number of free parameters (dimensionality of a position).
    fn dim(&self) -> usize;

    /// Draws one position from the prior.
    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError>;

    /// Log prior density at `position`; `-inf` outside the support.
    fn log_prior(&self, position: &[f64]) -> Result<f64, SmcError>;
}

/// Model with an explicit likelihood, consumed by the Metropolis kernel.
pub trait Model: Prior {
    /// Log likelihood of the observed data at `position`.
    fn log_likelihood(&self, position: &[f64]) -> Result<f64, SmcError>;

    /// Evaluates prior and likelihood. The likelihood is skipped outside the prior support.
    fn evaluate(&self, position: &[f64]) -> Result<Evaluation, SmcError> {
        let log_prior = self.log_prior(position)?;
        if !log_prior.is_finite() {
            return Ok(Evaluation::OUTSIDE);
        }
        let log_likelihood = self.log_likelihood(position)?;
        Ok(Evaluation {
            log_prior,
            log_likelihood,
        }
        .sanitized())
    }
}

/// Likelihood-free model, consumed by the ABC kernel.
pub trait Simulator: Prior {
    /// Simulates a data set at `position`.
    fn simulate(&self, position: &[f64], rng: &mut RngHandle) -> Result<Vec<f64>, SmcError>;

    /// Observed data the simulations are compared against.
    fn observed(&self) -> &[f64];
}

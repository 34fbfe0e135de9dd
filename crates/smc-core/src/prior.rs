//! Product prior over independent univariate components.

use serde::{Deserialize, Serialize};

use crate::distributions::Distribution;
use crate::errors::{ErrorInfo, SmcError};
use crate::rng::RngHandle;
use crate::Prior;

/// Prior whose density is the product of one [`Distribution`] per coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndependentPrior {
    components: Vec<Distribution>,
}

impl IndependentPrior {
    /// Creates a prior from its components, validating each one.
    pub fn new(components: Vec<Distribution>) -> Result<Self, SmcError> {
        let prior = Self { components };
        prior.validate()?;
        Ok(prior)
    }

    /// Validates every component and rejects an empty prior.
    pub fn validate(&self) -> Result<(), SmcError> {
        if self.components.is_empty() {
            return Err(SmcError::Configuration(ErrorInfo::new(
                "empty-prior",
                "a prior needs at least one component",
            )));
        }
        for (index, component) in self.components.iter().enumerate() {
            component
                .validate()
                .map_err(|err| err.with_context("component", index.to_string()))?;
        }
        Ok(())
    }

    /// Component distributions in coordinate order.
    pub fn components(&self) -> &[Distribution] {
        &self.components
    }
}

impl Prior for IndependentPrior {
    fn dim(&self) -> usize {
        self.components.len()
    }

    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        self.components
            .iter()
            .map(|component| component.sample(rng))
            .collect()
    }

    fn log_prior(&self, position: &[f64]) -> Result<f64, SmcError> {
        if position.len() != self.components.len() {
            return Err(SmcError::ModelEvaluation(
                ErrorInfo::new("dimension-mismatch", "position does not match prior dimension")
                    .with_context("expected", self.components.len().to_string())
                    .with_context("actual", position.len().to_string()),
            ));
        }
        let mut total = 0.0;
        for (component, &x) in self.components.iter().zip(position) {
            let lp = component.log_pdf(x);
            if lp == f64::NEG_INFINITY {
                return Ok(f64::NEG_INFINITY);
            }
            total += lp;
        }
        Ok(total)
    }
}

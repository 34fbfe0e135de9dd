use serde::{Deserialize, Serialize};
use smc_core::errors::{ErrorInfo, SmcError};
use smc_core::Evaluation;

/// One weighted sample: a position and its cached log densities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// Point in parameter space.
    pub position: Vec<f64>,
    /// Log prior density at `position`.
    pub log_prior: f64,
    /// Log likelihood at `position`.
    pub log_likelihood: f64,
}

impl Particle {
    /// Creates a particle from a position and its evaluation.
    pub fn new(position: Vec<f64>, evaluation: Evaluation) -> Self {
        let evaluation = evaluation.sanitized();
        Self {
            position,
            log_prior: evaluation.log_prior,
            log_likelihood: evaluation.log_likelihood,
        }
    }

    /// Tempered log target `beta * log_likelihood + log_prior`.
    ///
    /// At `beta == 0` the likelihood is ignored entirely so `-inf` likelihoods
    /// never produce `0 * -inf`.
    pub fn log_target(&self, beta: f64) -> f64 {
        if beta == 0.0 {
            self.log_prior
        } else {
            beta * self.log_likelihood + self.log_prior
        }
    }
}

/// Fixed-size particle population with normalized importance weights.
///
/// `particles.len() == weights.len() >= 1` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    particles: Vec<Particle>,
    weights: Vec<f64>,
}

impl Population {
    /// Builds a population with uniform weights.
    pub fn from_particles(particles: Vec<Particle>) -> Result<Self, SmcError> {
        if particles.is_empty() {
            return Err(SmcError::Configuration(ErrorInfo::new(
                "empty-population",
                "a population needs at least one particle",
            )));
        }
        let dim = particles[0].position.len();
        if let Some(index) = particles.iter().position(|p| p.position.len() != dim) {
            return Err(SmcError::Configuration(
                ErrorInfo::new("ragged-population", "particles differ in dimensionality")
                    .with_context("particle", index.to_string())
                    .with_context("expected", dim.to_string()),
            ));
        }
        let weights = uniform_weights(particles.len());
        Ok(Self { particles, weights })
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether the population holds no particles.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Dimensionality of every position.
    pub fn dim(&self) -> usize {
        self.particles[0].position.len()
    }

    /// Particles in index order.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Normalized importance weights aligned with `particles`.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Per-particle log likelihoods.
    pub fn log_likelihoods(&self) -> Vec<f64> {
        self.particles.iter().map(|p| p.log_likelihood).collect()
    }

    /// Clones the particle positions.
    pub fn positions(&self) -> Vec<Vec<f64>> {
        self.particles.iter().map(|p| p.position.clone()).collect()
    }

    pub(crate) fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub(crate) fn set_weights(&mut self, weights: Vec<f64>) {
        debug_assert_eq!(weights.len(), self.particles.len());
        self.weights = weights;
    }

    pub(crate) fn replace_particles(&mut self, particles: Vec<Particle>) {
        debug_assert_eq!(particles.len(), self.particles.len());
        self.particles = particles;
        self.weights = uniform_weights(self.particles.len());
    }

    pub(crate) fn into_particles(self) -> Vec<Particle> {
        self.particles
    }
}

fn uniform_weights(len: usize) -> Vec<f64> {
    vec![1.0 / len as f64; len]
}

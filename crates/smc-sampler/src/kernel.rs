use rayon::prelude::*;
use smc_core::{Evaluation, Model, RngHandle, Simulator, SmcError};

use crate::config::{DistanceKernel, SummaryStatistic};
use crate::determinism::mutation_seed;
use crate::population::{Particle, Population};
use crate::proposal::Proposal;

/// Tempered target seen by the mutation kernel.
///
/// Shared by every worker of a run, hence `Sync`.
pub trait Target: Sync {
    /// Dimensionality of a position.
    fn dim(&self) -> usize;

    /// Draws a starting position from the prior.
    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError>;

    /// Evaluates prior and (pseudo-)likelihood. `rng` feeds simulators.
    fn evaluate(&self, position: &[f64], rng: &mut RngHandle) -> Result<Evaluation, SmcError>;
}

/// Target with an explicit likelihood.
#[derive(Debug)]
pub struct ExactTarget<'a, M: ?Sized> {
    model: &'a M,
}

impl<'a, M: Model + ?Sized> ExactTarget<'a, M> {
    /// Wraps a model.
    pub fn new(model: &'a M) -> Self {
        Self { model }
    }
}

impl<M: Model + ?Sized> Target for ExactTarget<'_, M> {
    fn dim(&self) -> usize {
        self.model.dim()
    }

    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        self.model.sample_prior(rng)
    }

    fn evaluate(&self, position: &[f64], _rng: &mut RngHandle) -> Result<Evaluation, SmcError> {
        self.model.evaluate(position)
    }
}

/// Likelihood-free target scoring simulations with a distance kernel.
#[derive(Debug)]
pub struct AbcTarget<'a, S: ?Sized> {
    simulator: &'a S,
    observed_summary: Vec<f64>,
    sum_stat: SummaryStatistic,
    distance: DistanceKernel,
    epsilon: f64,
}

impl<'a, S: Simulator + ?Sized> AbcTarget<'a, S> {
    /// Wraps a simulator; the observed summary is computed once.
    pub fn new(
        simulator: &'a S,
        sum_stat: SummaryStatistic,
        distance: DistanceKernel,
        epsilon: f64,
    ) -> Self {
        let observed_summary = sum_stat.apply(simulator.observed());
        Self {
            simulator,
            observed_summary,
            sum_stat,
            distance,
            epsilon,
        }
    }

    /// Summary statistic of the observed data.
    pub fn observed_summary(&self) -> &[f64] {
        &self.observed_summary
    }
}

impl<S: Simulator + ?Sized> Target for AbcTarget<'_, S> {
    fn dim(&self) -> usize {
        self.simulator.dim()
    }

    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        self.simulator.sample_prior(rng)
    }

    fn evaluate(&self, position: &[f64], rng: &mut RngHandle) -> Result<Evaluation, SmcError> {
        let log_prior = self.simulator.log_prior(position)?;
        if !log_prior.is_finite() {
            return Ok(Evaluation::OUTSIDE);
        }
        let simulated = self.simulator.simulate(position, rng)?;
        let summary = self.sum_stat.apply(&simulated);
        let log_likelihood = self
            .distance
            .log_kernel(&self.observed_summary, &summary, self.epsilon);
        Ok(Evaluation {
            log_prior,
            log_likelihood,
        }
        .sanitized())
    }
}

/// Parameters of one mutation sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationSettings {
    /// Inverse temperature of the target.
    pub beta: f64,
    /// Proposal scale multiplying the factor.
    pub scale: f64,
    /// Metropolis steps per particle.
    pub n_steps: usize,
    /// Seed of the owning chain.
    pub chain_seed: u64,
    /// Stage index, part of the per-particle stream.
    pub stage: usize,
    /// Mutate particles concurrently.
    pub parallel: bool,
}

/// Acceptance counts of a mutation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
    /// Accepted proposals.
    pub accepted: usize,
    /// Proposed moves (`draws * n_steps`).
    pub proposed: usize,
}

impl MutationStats {
    /// Fraction of accepted proposals, in `[0, 1]`.
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

/// Metropolis acceptance rule: accept when `ln(u) < delta`.
pub fn accept(log_u: f64, current: f64, proposed: f64) -> bool {
    let delta = proposed - current;
    log_u < delta
}

/// Runs `n_steps` Metropolis-Hastings iterations on every particle.
///
/// Each particle draws from its own stream derived from
/// `(chain_seed, stage, index)`, so the concurrent and sequential paths give
/// identical populations. On failure the error of the lowest particle index
/// is returned.
pub fn mutate<T: Target + ?Sized>(
    target: &T,
    population: &mut Population,
    proposal: &Proposal,
    settings: &MutationSettings,
) -> Result<MutationStats, SmcError> {
    let particles = population.particles_mut();
    let proposed = particles.len() * settings.n_steps;
    let accepted = if settings.parallel {
        let outcomes: Vec<Result<usize, SmcError>> = particles
            .par_iter_mut()
            .enumerate()
            .map(|(index, particle)| mutate_particle(target, particle, proposal, settings, index))
            .collect();
        let mut accepted = 0;
        for outcome in outcomes {
            accepted += outcome?;
        }
        accepted
    } else {
        let mut accepted = 0;
        for (index, particle) in particles.iter_mut().enumerate() {
            accepted += mutate_particle(target, particle, proposal, settings, index)?;
        }
        accepted
    };
    Ok(MutationStats { accepted, proposed })
}

fn mutate_particle<T: Target + ?Sized>(
    target: &T,
    particle: &mut Particle,
    proposal: &Proposal,
    settings: &MutationSettings,
    index: usize,
) -> Result<usize, SmcError> {
    let mut rng = RngHandle::from_seed(mutation_seed(settings.chain_seed, settings.stage, index));
    let mut current = particle.log_target(settings.beta);
    let mut accepted = 0;
    for _ in 0..settings.n_steps {
        let position = proposal.perturb(&particle.position, settings.scale, &mut rng);
        let evaluation = target
            .evaluate(&position, &mut rng)
            .map_err(|err| err.with_context("particle", index.to_string()))?;
        let candidate = Particle::new(position, evaluation);
        let candidate_target = candidate.log_target(settings.beta);
        if accept(rng.uniform().ln(), current, candidate_target) {
            *particle = candidate;
            current = candidate_target;
            accepted += 1;
        }
    }
    Ok(accepted)
}

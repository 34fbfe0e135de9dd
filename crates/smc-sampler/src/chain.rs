use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use smc_core::errors::{ErrorInfo, SmcError};
use smc_core::RngHandle;
use tracing::{debug, info, warn};

use crate::config::SmcConfig;
use crate::determinism::driver_seed;
use crate::kernel::{mutate, MutationSettings, Target};
use crate::population::{Particle, Population};
use crate::proposal::Proposal;
use crate::reweight::{resample, update_weights_beta};
use crate::tempering::next_beta;
use crate::tuning::{initial_scale, StepTuner};

/// Error code of a chain stopped because a sibling chain failed.
pub(crate) const CANCELLED: &str = "cancelled";

/// Phase of the per-stage loop. Initialization happens in
/// [`ChainDriver::initialize`], so a constructed driver starts at `Reweighting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Choose the next beta and reweight.
    Reweighting,
    /// Adapt the proposal and resample.
    Resampling,
    /// Run the mutation kernel at the new beta.
    Mutating,
    /// Adapt step count and scale, record the stage.
    Tuning,
    /// `beta == 1`; the population targets the posterior.
    Terminal,
}

impl Phase {
    /// Lowercase phase name used in error context.
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Reweighting => "reweighting",
            Phase::Resampling => "resampling",
            Phase::Mutating => "mutating",
            Phase::Tuning => "tuning",
            Phase::Terminal => "terminal",
        }
    }
}

/// Per-chain view of the run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainSettings {
    /// Chain index.
    pub chain: usize,
    /// Seed of the chain's streams.
    pub seed: u64,
    /// Particles per population.
    pub draws: usize,
    /// Initial steps per particle per stage.
    pub n_steps: usize,
    /// ESS fraction targeted by the tempering controller.
    pub threshold: f64,
    /// Bisection tolerance on beta.
    pub beta_tolerance: f64,
    /// Stage guard.
    pub max_stages: usize,
    /// Mutate particles concurrently.
    pub parallel_mutation: bool,
}

impl ChainSettings {
    /// Extracts the settings of chain `chain` seeded with `seed`.
    pub fn from_config(config: &SmcConfig, chain: usize, seed: u64) -> Self {
        Self {
            chain,
            seed,
            draws: config.draws,
            n_steps: config.n_steps,
            threshold: config.threshold,
            beta_tolerance: config.schedule.beta_tolerance,
            max_stages: config.schedule.max_stages,
            parallel_mutation: config.parallel_mutation,
        }
    }
}

/// Mutable stage state carried between phases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageState {
    /// Number of completed reweighting steps.
    pub stage: usize,
    /// Current inverse temperature.
    pub beta: f64,
    /// Steps per particle for the next mutation.
    pub n_steps: usize,
    /// Scale multiplying the proposal factor.
    pub proposal_scale: f64,
    /// Acceptance rate of the latest mutation.
    pub acc_rate: f64,
    /// Accumulated log evidence.
    pub log_marginal_likelihood: f64,
}

/// Output of one completed chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainResult {
    /// Chain index.
    pub chain: usize,
    /// Seed the chain ran with.
    pub seed: u64,
    /// Final particle positions.
    pub posterior_samples: Vec<Vec<f64>>,
    /// Log prior of each final particle.
    pub log_prior: Vec<f64>,
    /// Log likelihood of each final particle.
    pub log_likelihood: Vec<f64>,
    /// Sum of the per-stage evidence increments.
    pub log_marginal_likelihood: f64,
    /// Beta reached at each stage.
    pub betas: Vec<f64>,
    /// Acceptance rate of each stage's mutation.
    pub accept_ratios: Vec<f64>,
    /// Step count after each stage's tuning.
    pub nsteps: Vec<usize>,
    /// Number of stages run.
    pub stages: usize,
}

#[derive(Debug, Default, Clone)]
struct History {
    betas: Vec<f64>,
    accept_ratios: Vec<f64>,
    nsteps: Vec<usize>,
}

/// Drives one SMC chain from the prior to the posterior.
pub struct ChainDriver<'a, T: ?Sized> {
    target: &'a T,
    settings: ChainSettings,
    tuner: StepTuner,
    rng: RngHandle,
    population: Population,
    proposal: Proposal,
    state: StageState,
    phase: Phase,
    resample_pending: bool,
    history: History,
    cancel: Option<&'a AtomicBool>,
}

impl<'a, T: Target + ?Sized> ChainDriver<'a, T> {
    /// Draws (or adopts) the initial population at `beta = 0`.
    ///
    /// `start` must hold `draws` positions of the target's dimensionality.
    /// Fails with `ModelEvaluation` when no initial particle evaluates to
    /// finite values.
    pub fn initialize(
        target: &'a T,
        config: &SmcConfig,
        settings: ChainSettings,
        start: Option<&[Vec<f64>]>,
    ) -> Result<Self, SmcError> {
        let chain = settings.chain;
        Self::initialize_inner(target, config, settings, start).map_err(|err| {
            err.with_context("chain", chain.to_string())
                .with_context("stage", "0")
        })
    }

    fn initialize_inner(
        target: &'a T,
        config: &SmcConfig,
        settings: ChainSettings,
        start: Option<&[Vec<f64>]>,
    ) -> Result<Self, SmcError> {
        let dim = target.dim();
        let mut rng = RngHandle::from_seed(driver_seed(settings.seed));
        let positions = match start {
            Some(start) => {
                validate_start(start, settings.draws, dim)?;
                start.to_vec()
            }
            None => {
                let mut positions = Vec::with_capacity(settings.draws);
                for _ in 0..settings.draws {
                    let position = target.sample_prior(&mut rng)?;
                    if position.len() != dim {
                        return Err(SmcError::ModelEvaluation(
                            ErrorInfo::new("prior-dimension", "prior draw does not match model dimension")
                                .with_context("expected", dim.to_string())
                                .with_context("actual", position.len().to_string()),
                        ));
                    }
                    positions.push(position);
                }
                positions
            }
        };

        let mut particles = Vec::with_capacity(positions.len());
        let mut evaluations = Vec::with_capacity(positions.len());
        for (index, position) in positions.into_iter().enumerate() {
            let evaluation = target
                .evaluate(&position, &mut rng)
                .map_err(|err| err.with_context("particle", index.to_string()))?;
            evaluations.push(evaluation);
            particles.push(Particle::new(position, evaluation));
        }
        let finite = evaluations.iter().filter(|e| e.is_finite()).count();
        if finite == 0 {
            return Err(SmcError::ModelEvaluation(
                ErrorInfo::new("no-finite-particle", "no initial particle has a finite prior and likelihood")
                    .with_context("draws", settings.draws.to_string())
                    .with_hint("check that the prior sampler draws inside the model support"),
            ));
        }
        let population = Population::from_particles(particles)?;
        debug!(chain = settings.chain, draws = settings.draws, dim, finite, "chain initialized");

        let state = StageState {
            stage: 0,
            beta: 0.0,
            n_steps: settings.n_steps,
            proposal_scale: initial_scale(dim),
            acc_rate: 1.0,
            log_marginal_likelihood: 0.0,
        };
        Ok(Self {
            target,
            tuner: StepTuner::from_config(config),
            settings,
            rng,
            population,
            proposal: Proposal::isotropic(dim),
            state,
            phase: Phase::Reweighting,
            resample_pending: false,
            history: History::default(),
            cancel: None,
        })
    }

    /// Stops the chain at the next stage boundary once `flag` is raised.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Phase the next call to [`advance`](Self::advance) executes.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current stage state.
    pub fn state(&self) -> &StageState {
        &self.state
    }

    /// Current population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Executes the current phase and returns the next one.
    pub fn advance(&mut self) -> Result<Phase, SmcError> {
        let phase = self.phase;
        self.step().map_err(|err| {
            err.with_context("chain", self.settings.chain.to_string())
                .with_context("stage", self.state.stage.to_string())
                .with_context("phase", phase.name())
        })
    }

    /// Advances until the terminal phase and returns the chain result.
    pub fn run(mut self) -> Result<ChainResult, SmcError> {
        while self.advance()? != Phase::Terminal {}
        Ok(self.into_result())
    }

    fn step(&mut self) -> Result<Phase, SmcError> {
        self.phase = match self.phase {
            Phase::Reweighting => self.reweight()?,
            Phase::Resampling => self.resample()?,
            Phase::Mutating => self.mutate()?,
            Phase::Tuning => self.tune(),
            Phase::Terminal => Phase::Terminal,
        };
        Ok(self.phase)
    }

    fn reweight(&mut self) -> Result<Phase, SmcError> {
        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(SmcError::WorkerFailure(
                ErrorInfo::new(CANCELLED, "chain stopped because a sibling chain failed"),
            ));
        }
        if self.state.stage >= self.settings.max_stages {
            return Err(SmcError::DegenerateWeights(
                ErrorInfo::new("stage-limit", "tempering schedule exceeded the stage limit")
                    .with_context("max_stages", self.settings.max_stages.to_string())
                    .with_context("beta", self.state.beta.to_string())
                    .with_hint("lower `threshold` or raise `schedule.beta_tolerance`"),
            ));
        }
        let beta = self.state.beta;
        let beta_new = next_beta(
            beta,
            &self.population.log_likelihoods(),
            self.settings.threshold,
            self.settings.beta_tolerance,
        )?;
        self.resample_pending = beta_new > beta;
        if self.resample_pending {
            let increment = update_weights_beta(&mut self.population, beta, beta_new)?;
            self.state.log_marginal_likelihood += increment;
        }
        self.state.beta = beta_new;
        self.state.stage += 1;
        Ok(Phase::Resampling)
    }

    fn resample(&mut self) -> Result<Phase, SmcError> {
        self.proposal = Proposal::from_population(&self.population);
        if self.proposal.is_fallback() {
            warn!(
                chain = self.settings.chain,
                stage = self.state.stage,
                "weighted covariance is not positive definite, using scalar variance"
            );
        }
        if self.resample_pending {
            resample(&mut self.population, &mut self.rng);
        }
        Ok(Phase::Mutating)
    }

    fn mutate(&mut self) -> Result<Phase, SmcError> {
        let settings = MutationSettings {
            beta: self.state.beta,
            scale: self.state.proposal_scale,
            n_steps: self.state.n_steps,
            chain_seed: self.settings.seed,
            stage: self.state.stage,
            parallel: self.settings.parallel_mutation,
        };
        let stats = mutate(self.target, &mut self.population, &self.proposal, &settings)?;
        self.state.acc_rate = stats.acceptance_rate();
        Ok(Phase::Tuning)
    }

    fn tune(&mut self) -> Phase {
        let acc_rate = self.state.acc_rate;
        self.state.n_steps = self.tuner.tune_steps(self.state.n_steps, acc_rate);
        self.state.proposal_scale = self.tuner.tune_scale(self.state.proposal_scale, acc_rate);
        self.history.betas.push(self.state.beta);
        self.history.accept_ratios.push(acc_rate);
        self.history.nsteps.push(self.state.n_steps);
        info!(
            chain = self.settings.chain,
            stage = self.state.stage,
            beta = self.state.beta,
            acc_rate,
            n_steps = self.state.n_steps,
            "stage complete"
        );
        if self.state.beta >= 1.0 {
            Phase::Terminal
        } else {
            Phase::Reweighting
        }
    }

    fn into_result(self) -> ChainResult {
        let stages = self.history.betas.len();
        let particles = self.population.into_particles();
        let log_prior = particles.iter().map(|p| p.log_prior).collect();
        let log_likelihood = particles.iter().map(|p| p.log_likelihood).collect();
        let posterior_samples = particles.into_iter().map(|p| p.position).collect();
        ChainResult {
            chain: self.settings.chain,
            seed: self.settings.seed,
            posterior_samples,
            log_prior,
            log_likelihood,
            log_marginal_likelihood: self.state.log_marginal_likelihood,
            betas: self.history.betas,
            accept_ratios: self.history.accept_ratios,
            nsteps: self.history.nsteps,
            stages,
        }
    }
}

fn validate_start(start: &[Vec<f64>], draws: usize, dim: usize) -> Result<(), SmcError> {
    if start.len() != draws {
        return Err(SmcError::Configuration(
            ErrorInfo::new("start-size", "start population must hold `draws` positions")
                .with_context("expected", draws.to_string())
                .with_context("actual", start.len().to_string()),
        ));
    }
    if let Some(index) = start.iter().position(|p| p.len() != dim) {
        return Err(SmcError::Configuration(
            ErrorInfo::new("start-dimension", "start position does not match model dimension")
                .with_context("particle", index.to_string())
                .with_context("expected", dim.to_string()),
        ));
    }
    Ok(())
}

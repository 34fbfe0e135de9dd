use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use smc_core::errors::{ErrorInfo, SmcError};
use smc_core::{Model, Simulator};
use tracing::{info, info_span};

use crate::chain::{ChainDriver, ChainResult, ChainSettings, CANCELLED};
use crate::config::{KernelConfig, SmcConfig};
use crate::determinism::resolve_chain_seeds;
use crate::kernel::{AbcTarget, ExactTarget, Target};

/// Merged output of all chains of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Chain results indexed by chain id.
    pub chains: Vec<ChainResult>,
    /// Master seed of the run (entropy-drawn when none was configured).
    pub master_seed: u64,
    /// Particles per chain.
    pub draws: usize,
    /// Wall time of the sampling phase.
    pub elapsed: Duration,
}

impl RunResult {
    /// Posterior samples of all chains, in chain order.
    pub fn combined_samples(&self) -> Vec<Vec<f64>> {
        self.chains
            .iter()
            .flat_map(|chain| chain.posterior_samples.iter().cloned())
            .collect()
    }

    /// Log marginal likelihood of each chain.
    pub fn log_marginal_likelihoods(&self) -> Vec<f64> {
        self.chains.iter().map(|c| c.log_marginal_likelihood).collect()
    }

    /// Beta schedule of each chain.
    pub fn betas(&self) -> Vec<&[f64]> {
        self.chains.iter().map(|c| c.betas.as_slice()).collect()
    }

    /// Per-stage acceptance rates of each chain.
    pub fn accept_ratios(&self) -> Vec<&[f64]> {
        self.chains.iter().map(|c| c.accept_ratios.as_slice()).collect()
    }

    /// Per-stage step counts of each chain.
    pub fn nsteps(&self) -> Vec<&[usize]> {
        self.chains.iter().map(|c| c.nsteps.as_slice()).collect()
    }
}

/// Samples the posterior of `model` with the Metropolis kernel.
pub fn sample_smc<M: Model + ?Sized>(config: &SmcConfig, model: &M) -> Result<RunResult, SmcError> {
    require_metropolis(config)?;
    run_chains(config, &ExactTarget::new(model), None)
}

/// Like [`sample_smc`], starting chain `i` from `start[i]` instead of prior draws.
pub fn sample_smc_with_start<M: Model + ?Sized>(
    config: &SmcConfig,
    model: &M,
    start: &[Vec<Vec<f64>>],
) -> Result<RunResult, SmcError> {
    require_metropolis(config)?;
    run_chains(config, &ExactTarget::new(model), Some(start))
}

/// Samples an approximate posterior of `simulator` with the ABC kernel.
pub fn sample_smc_abc<S: Simulator + ?Sized>(
    config: &SmcConfig,
    simulator: &S,
) -> Result<RunResult, SmcError> {
    let target = abc_target(config, simulator)?;
    run_chains(config, &target, None)
}

/// Like [`sample_smc_abc`], starting chain `i` from `start[i]`.
pub fn sample_smc_abc_with_start<S: Simulator + ?Sized>(
    config: &SmcConfig,
    simulator: &S,
    start: &[Vec<Vec<f64>>],
) -> Result<RunResult, SmcError> {
    let target = abc_target(config, simulator)?;
    run_chains(config, &target, Some(start))
}

fn require_metropolis(config: &SmcConfig) -> Result<(), SmcError> {
    match config.kernel {
        KernelConfig::Metropolis => Ok(()),
        _ => Err(kernel_mismatch(&config.kernel, "metropolis", "sample_smc_abc")),
    }
}

fn abc_target<'a, S: Simulator + ?Sized>(
    config: &SmcConfig,
    simulator: &'a S,
) -> Result<AbcTarget<'a, S>, SmcError> {
    match &config.kernel {
        KernelConfig::Abc {
            epsilon,
            sum_stat,
            distance,
        } => Ok(AbcTarget::new(simulator, *sum_stat, *distance, *epsilon)),
        other => Err(kernel_mismatch(other, "abc", "sample_smc")),
    }
}

fn kernel_mismatch(kernel: &KernelConfig, expected: &str, alternative: &str) -> SmcError {
    SmcError::Configuration(
        ErrorInfo::new("kernel-mismatch", "configured kernel does not match the entry point")
            .with_context("kernel", kernel.name())
            .with_context("expected", expected)
            .with_hint(format!("use `{alternative}` for this kernel")),
    )
}

/// Runs every chain of `config` against `target` and merges the results.
///
/// With `parallel` and more than one core the chains fan out over a rayon
/// pool of `cores` threads; otherwise they run in chain order. A failing or
/// panicking chain raises a shared cancellation flag; once all workers are
/// joined the first error in chain order is returned, preferring genuine
/// failures over cancellations.
pub fn run_chains<T: Target + ?Sized>(
    config: &SmcConfig,
    target: &T,
    start: Option<&[Vec<Vec<f64>>]>,
) -> Result<RunResult, SmcError> {
    config.validate()?;
    let chains = config.resolved_chains();
    let cores = config.resolved_cores();
    if let Some(start) = start {
        if start.len() != chains {
            return Err(SmcError::Configuration(
                ErrorInfo::new("start-chains", "one start population is required per chain")
                    .with_context("expected", chains.to_string())
                    .with_context("actual", start.len().to_string()),
            ));
        }
    }
    let (master_seed, seeds) = resolve_chain_seeds(config.random_seed.as_ref(), chains)?;
    let parallel = config.parallel && cores > 1 && chains > 1;
    info!(
        chains,
        cores,
        parallel,
        draws = config.draws,
        kernel = config.kernel.name(),
        master_seed,
        "starting SMC run"
    );

    let cancel = AtomicBool::new(false);
    let run_one = |chain: usize| -> Result<ChainResult, SmcError> {
        let span = info_span!("chain", chain);
        let _entered = span.enter();
        let settings = ChainSettings::from_config(config, chain, seeds[chain]);
        let chain_start = start.map(|start| start[chain].as_slice());
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            ChainDriver::initialize(target, config, settings, chain_start)?
                .with_cancel(&cancel)
                .run()
        }));
        let result = outcome.unwrap_or_else(|payload| Err(panic_failure(chain, payload.as_ref())));
        match &result {
            Ok(chain_result) => info!(
                chain,
                stages = chain_result.stages,
                log_marginal_likelihood = chain_result.log_marginal_likelihood,
                "chain finished"
            ),
            Err(_) => cancel.store(true, Ordering::Relaxed),
        }
        result
    };

    let started = Instant::now();
    let results = if parallel {
        let pool = ThreadPoolBuilder::new()
            .num_threads(cores)
            .build()
            .map_err(|err| {
                SmcError::WorkerFailure(
                    ErrorInfo::new("thread-pool", err.to_string())
                        .with_context("cores", cores.to_string()),
                )
            })?;
        let outcomes: Vec<Result<ChainResult, SmcError>> =
            pool.install(|| (0..chains).into_par_iter().map(run_one).collect());
        join_outcomes(outcomes)?
    } else {
        let mut results = Vec::with_capacity(chains);
        for chain in 0..chains {
            results.push(run_one(chain)?);
        }
        results
    };
    let elapsed = started.elapsed();
    info!(chains, elapsed_secs = elapsed.as_secs_f64(), "SMC run complete");

    Ok(RunResult {
        chains: results,
        master_seed,
        draws: config.draws,
        elapsed,
    })
}

fn join_outcomes(
    outcomes: Vec<Result<ChainResult, SmcError>>,
) -> Result<Vec<ChainResult>, SmcError> {
    let mut results = Vec::with_capacity(outcomes.len());
    let mut first_cancelled = None;
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) if is_cancellation(&err) => {
                first_cancelled.get_or_insert(err);
            }
            Err(err) => return Err(err),
        }
    }
    match first_cancelled {
        Some(err) => Err(err),
        None => Ok(results),
    }
}

fn is_cancellation(err: &SmcError) -> bool {
    matches!(err, SmcError::WorkerFailure(info) if info.code == CANCELLED)
}

fn panic_failure(chain: usize, payload: &(dyn Any + Send)) -> SmcError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "worker panicked".to_string());
    SmcError::WorkerFailure(
        ErrorInfo::new("worker-panicked", message).with_context("chain", chain.to_string()),
    )
}

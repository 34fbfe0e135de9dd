use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use smc_core::errors::{ErrorInfo, SmcError};

use crate::config::SmcConfig;
use crate::diagnostics::{gelman_rubin, summarize, ChainSummary};
use crate::orchestrator::RunResult;

/// Diagnostics of one chain; samples are not included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainReport {
    /// Chain index.
    pub chain: usize,
    /// Seed the chain ran with.
    pub seed: u64,
    /// Log marginal likelihood estimate.
    pub log_marginal_likelihood: f64,
    /// Number of tempering stages.
    pub stages: usize,
    /// Beta schedule.
    pub betas: Vec<f64>,
    /// Per-stage acceptance rates.
    pub accept_ratios: Vec<f64>,
    /// Per-stage step counts after tuning.
    pub nsteps: Vec<usize>,
    /// Posterior moments.
    pub summary: ChainSummary,
}

/// JSON diagnostics report of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Configuration used for the run.
    pub config: SmcConfig,
    /// Master seed used to derive chain seeds.
    pub master_seed: u64,
    /// Particles per chain.
    pub draws: usize,
    /// Sampling wall time in seconds.
    pub sampling_time_secs: f64,
    /// Per-chain diagnostics in chain order.
    pub chains: Vec<ChainReport>,
    /// Gelman-Rubin statistic per dimension (`null` when undefined).
    pub r_hat: Vec<Option<f64>>,
}

impl RunReport {
    /// Builds the report of `run` executed with `config`.
    pub fn from_run(config: &SmcConfig, run: &RunResult) -> Self {
        let chains = run
            .chains
            .iter()
            .map(|chain| ChainReport {
                chain: chain.chain,
                seed: chain.seed,
                log_marginal_likelihood: chain.log_marginal_likelihood,
                stages: chain.stages,
                betas: chain.betas.clone(),
                accept_ratios: chain.accept_ratios.clone(),
                nsteps: chain.nsteps.clone(),
                summary: summarize(&chain.posterior_samples),
            })
            .collect();
        let samples: Vec<Vec<Vec<f64>>> = run
            .chains
            .iter()
            .map(|chain| chain.posterior_samples.clone())
            .collect();
        Self {
            config: config.clone(),
            master_seed: run.master_seed,
            draws: run.draws,
            sampling_time_secs: run.elapsed.as_secs_f64(),
            chains,
            r_hat: gelman_rubin(&samples),
        }
    }

    /// Writes the report to a pretty JSON file, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), SmcError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                SmcError::Serde(
                    ErrorInfo::new("report-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            SmcError::Serde(
                ErrorInfo::new("report-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            SmcError::Serde(
                ErrorInfo::new("report-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a report from disk.
    pub fn load(path: &Path) -> Result<Self, SmcError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            SmcError::Serde(
                ErrorInfo::new("report-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            SmcError::Serde(
                ErrorInfo::new("report-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}

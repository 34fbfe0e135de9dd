#![deny(missing_docs)]

//! Adaptive-tempering Sequential Monte Carlo sampler.
//!
//! A population of weighted particles is moved from the prior (`beta = 0`)
//! to the posterior (`beta = 1`) through a sequence of tempered
//! distributions. Each stage reweights, resamples and mutates the particles;
//! several independent chains are orchestrated and merged.

/// Single-chain stage driver.
pub mod chain;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Posterior summaries and convergence diagnostics.
pub mod diagnostics;
/// Metropolis and ABC mutation kernels.
pub mod kernel;
/// Multi-chain orchestration and public entry points.
pub mod orchestrator;
/// Particles and weighted populations.
pub mod population;
/// Proposal covariance adaptation.
pub mod proposal;
/// JSON diagnostics report.
pub mod report;
/// Importance reweighting and systematic resampling.
pub mod reweight;
/// Adaptive tempering controller.
pub mod tempering;
/// Step count and proposal scale tuning.
pub mod tuning;

pub use chain::{ChainDriver, ChainResult, ChainSettings, Phase, StageState};
pub use config::{
    DistanceKernel, KernelConfig, ScheduleConfig, SeedSpec, SmcConfig, SummaryStatistic,
    TuningConfig,
};
pub use orchestrator::{
    run_chains, sample_smc, sample_smc_abc, sample_smc_abc_with_start, sample_smc_with_start,
    RunResult,
};
pub use population::{Particle, Population};
pub use report::RunReport;

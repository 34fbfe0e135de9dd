use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use smc_sampler::{sample_smc, sample_smc_abc, KernelConfig, RunReport, SmcConfig};
use tracing::info;

use crate::model::ModelSpec;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML sampler configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// YAML model description (priors and likelihood).
    #[arg(long)]
    pub model: PathBuf,
    /// Output directory for the report.
    #[arg(long)]
    pub out: PathBuf,
    /// Overrides the configured master seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &RunArgs) -> Result<RunReport, Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let mut config = SmcConfig::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.random_seed = Some(smc_sampler::SeedSpec::Single(seed));
    }
    let model = ModelSpec::load(&args.model)?;

    let run = match config.kernel {
        KernelConfig::Metropolis => sample_smc(&config, &model)?,
        KernelConfig::Abc { .. } => sample_smc_abc(&config, &model)?,
    };
    let report = RunReport::from_run(&config, &run);
    let report_path = args.out.join("report.json");
    report.write(&report_path)?;
    info!(path = %report_path.display(), "report written");

    // Persist inputs next to the report for reproducibility.
    fs::copy(&args.config, args.out.join("config.yaml")).ok();
    fs::copy(&args.model, args.out.join("model.yaml")).ok();

    Ok(report)
}

use std::error::Error;
use std::io;

use clap::{Parser, Subcommand};
use smc_sim::commands::{
    distributions,
    run::{self, RunArgs},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "smc-sim", about = "Sequential Monte Carlo sampler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample a posterior from a sampler configuration and a model description.
    Run(RunArgs),
    /// List the registered prior distributions and their parameters.
    Distributions,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            let report = run::run(&args)?;
            for chain in &report.chains {
                println!(
                    "chain {}: stages={} log_marginal_likelihood={:.4}",
                    chain.chain, chain.stages, chain.log_marginal_likelihood
                );
            }
            Ok(())
        }
        Command::Distributions => distributions::run(&mut io::stdout().lock()),
    }
}

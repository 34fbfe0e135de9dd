use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use smc_core::errors::{ErrorInfo, SmcError};

/// YAML-configurable parameters governing an SMC run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmcConfig {
    /// Number of particles per chain.
    #[serde(default = "default_draws")]
    pub draws: usize,
    /// Metropolis steps per particle per stage (upper bound when tuning).
    #[serde(default = "default_n_steps")]
    pub n_steps: usize,
    /// Whether the number of steps is adapted from the acceptance rate.
    #[serde(default = "default_true")]
    pub tune_steps: bool,
    /// Target probability that a particle moves at least once in a stage.
    #[serde(default = "default_p_acc_rate")]
    pub p_acc_rate: f64,
    /// Fraction of `draws` the effective sample size must reach per stage.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Mutation kernel.
    #[serde(default)]
    pub kernel: KernelConfig,
    /// Number of independent chains; defaults to `max(2, cores)`.
    #[serde(default)]
    pub chains: Option<usize>,
    /// Worker threads for chain fan-out; defaults to the available parallelism capped at 4.
    #[serde(default)]
    pub cores: Option<usize>,
    /// Run chains concurrently when more than one core is available.
    #[serde(default = "default_true")]
    pub parallel: bool,
    /// Mutate the particles of a stage concurrently.
    #[serde(default)]
    pub parallel_mutation: bool,
    /// Master seed or explicit per-chain seeds. Drawn from entropy when absent.
    #[serde(default)]
    pub random_seed: Option<SeedSpec>,
    /// Proposal scale adaptation.
    #[serde(default)]
    pub tuning: TuningConfig,
    /// Tempering schedule limits.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

fn default_draws() -> usize {
    2000
}

fn default_n_steps() -> usize {
    25
}

fn default_true() -> bool {
    true
}

fn default_p_acc_rate() -> f64 {
    0.99
}

fn default_threshold() -> f64 {
    0.5
}

impl Default for SmcConfig {
    fn default() -> Self {
        Self {
            draws: default_draws(),
            n_steps: default_n_steps(),
            tune_steps: true,
            p_acc_rate: default_p_acc_rate(),
            threshold: default_threshold(),
            kernel: KernelConfig::default(),
            chains: None,
            cores: None,
            parallel: true,
            parallel_mutation: false,
            random_seed: None,
            tuning: TuningConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

/// Supported mutation kernels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum KernelConfig {
    /// Random-walk Metropolis on the tempered posterior.
    Metropolis,
    /// Likelihood-free kernel scoring simulations against the observed data.
    Abc {
        /// Bandwidth of the distance kernel.
        #[serde(default = "default_epsilon")]
        epsilon: f64,
        /// Summary statistic applied to observed and simulated data.
        #[serde(default)]
        sum_stat: SummaryStatistic,
        /// Kernel turning the summary distance into a pseudo-likelihood.
        #[serde(default)]
        distance: DistanceKernel,
    },
}

fn default_epsilon() -> f64 {
    1.0
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig::Metropolis
    }
}

impl KernelConfig {
    /// Short name used in logs and error context.
    pub fn name(&self) -> &'static str {
        match self {
            KernelConfig::Metropolis => "metropolis",
            KernelConfig::Abc { .. } => "abc",
        }
    }
}

/// Summary statistics available to the ABC kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryStatistic {
    /// Raw data.
    #[default]
    Identity,
    /// Data sorted ascending.
    Sorted,
    /// Arithmetic mean.
    Mean,
    /// Median.
    Median,
}

impl SummaryStatistic {
    /// Applies the statistic to a data vector.
    pub fn apply(&self, data: &[f64]) -> Vec<f64> {
        match self {
            SummaryStatistic::Identity => data.to_vec(),
            SummaryStatistic::Sorted => sorted(data),
            SummaryStatistic::Mean if data.is_empty() => Vec::new(),
            SummaryStatistic::Mean => vec![data.iter().sum::<f64>() / data.len() as f64],
            SummaryStatistic::Median if data.is_empty() => Vec::new(),
            SummaryStatistic::Median => {
                let values = sorted(data);
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    vec![0.5 * (values[mid - 1] + values[mid])]
                } else {
                    vec![values[mid]]
                }
            }
        }
    }
}

fn sorted(data: &[f64]) -> Vec<f64> {
    let mut values = data.to_vec();
    values.sort_by(f64::total_cmp);
    values
}

/// Distance kernels available to the ABC kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceKernel {
    /// `-0.5 * sum(((obs - sim) / epsilon)^2)`.
    #[default]
    Gaussian,
}

impl DistanceKernel {
    /// Pseudo log-likelihood of a simulated summary given the observed one.
    pub fn log_kernel(&self, observed: &[f64], simulated: &[f64], epsilon: f64) -> f64 {
        if observed.len() != simulated.len() {
            return f64::NEG_INFINITY;
        }
        match self {
            DistanceKernel::Gaussian => {
                let sq: f64 = observed
                    .iter()
                    .zip(simulated)
                    .map(|(o, s)| ((o - s) / epsilon).powi(2))
                    .sum();
                -0.5 * sq
            }
        }
    }
}

/// Seed policy: one master seed or an explicit seed per chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    /// Master seed; chain seeds are derived substreams.
    Single(u64),
    /// One seed per chain, used verbatim.
    PerChain(Vec<u64>),
}

/// Proposal scale adaptation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Acceptance rate the proposal scale is steered towards.
    #[serde(default = "default_target_acc_rate")]
    pub target_acc_rate: f64,
    /// Lower clamp for the proposal scale.
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    /// Upper clamp for the proposal scale.
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
}

fn default_target_acc_rate() -> f64 {
    0.234
}

fn default_min_scale() -> f64 {
    1e-4
}

fn default_max_scale() -> f64 {
    10.0
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            target_acc_rate: default_target_acc_rate(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
        }
    }
}

/// Tempering schedule limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Bracket width at which the beta bisection stops.
    #[serde(default = "default_beta_tolerance")]
    pub beta_tolerance: f64,
    /// Maximum number of tempering stages before the run is declared degenerate.
    #[serde(default = "default_max_stages")]
    pub max_stages: usize,
}

fn default_beta_tolerance() -> f64 {
    1e-6
}

fn default_max_stages() -> usize {
    10_000
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            beta_tolerance: default_beta_tolerance(),
            max_stages: default_max_stages(),
        }
    }
}

impl SmcConfig {
    /// Parses and validates a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, SmcError> {
        let config: SmcConfig = serde_yaml::from_str(yaml).map_err(|err| {
            SmcError::Serde(ErrorInfo::new("config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, SmcError> {
        let yaml = fs::read_to_string(path).map_err(|err| {
            SmcError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&yaml).map_err(|err| err.with_context("path", path.display().to_string()))
    }

    /// Worker threads used for chain fan-out.
    pub fn resolved_cores(&self) -> usize {
        self.cores.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(4)
        })
    }

    /// Number of chains to run.
    pub fn resolved_chains(&self) -> usize {
        self.chains.unwrap_or_else(|| self.resolved_cores().max(2))
    }

    /// Rejects invalid options and option combinations.
    pub fn validate(&self) -> Result<(), SmcError> {
        if self.draws < 1 {
            return Err(SmcError::config("invalid-draws", "draws must be at least 1", "draws", self.draws));
        }
        if self.n_steps < 1 {
            return Err(SmcError::config(
                "invalid-n-steps",
                "n_steps must be at least 1",
                "n_steps",
                self.n_steps,
            ));
        }
        if !(self.threshold > 0.0 && self.threshold <= 1.0) {
            return Err(SmcError::config(
                "invalid-threshold",
                "threshold must lie in (0, 1]",
                "threshold",
                self.threshold,
            ));
        }
        if !(self.p_acc_rate > 0.0 && self.p_acc_rate < 1.0) {
            return Err(SmcError::config(
                "invalid-p-acc-rate",
                "p_acc_rate must lie in (0, 1)",
                "p_acc_rate",
                self.p_acc_rate,
            ));
        }
        if let KernelConfig::Abc { epsilon, .. } = &self.kernel {
            if !(epsilon.is_finite() && *epsilon > 0.0) {
                return Err(SmcError::config(
                    "invalid-epsilon",
                    "epsilon must be positive and finite",
                    "epsilon",
                    epsilon,
                ));
            }
        }
        if self.chains == Some(0) {
            return Err(SmcError::config("invalid-chains", "chains must be at least 1", "chains", 0));
        }
        if self.cores == Some(0) {
            return Err(SmcError::config("invalid-cores", "cores must be at least 1", "cores", 0));
        }
        if let Some(SeedSpec::PerChain(seeds)) = &self.random_seed {
            let chains = self.resolved_chains();
            if seeds.len() != chains {
                return Err(SmcError::Configuration(
                    ErrorInfo::new("seed-count-mismatch", "one seed is required per chain")
                        .with_context("seeds", seeds.len().to_string())
                        .with_context("chains", chains.to_string())
                        .with_hint("pass a single integer to derive per-chain seeds"),
                ));
            }
        }
        self.tuning.validate()?;
        self.schedule.validate()
    }
}

impl TuningConfig {
    fn validate(&self) -> Result<(), SmcError> {
        if !(self.target_acc_rate > 0.0 && self.target_acc_rate < 1.0) {
            return Err(SmcError::config(
                "invalid-target-acc-rate",
                "target_acc_rate must lie in (0, 1)",
                "target_acc_rate",
                self.target_acc_rate,
            ));
        }
        let ordered = self.min_scale > 0.0 && self.min_scale <= self.max_scale;
        if !ordered || !self.max_scale.is_finite() {
            return Err(SmcError::Configuration(
                ErrorInfo::new("invalid-scale-bounds", "requires 0 < min_scale <= max_scale < inf")
                    .with_context("min_scale", self.min_scale.to_string())
                    .with_context("max_scale", self.max_scale.to_string()),
            ));
        }
        Ok(())
    }
}

impl ScheduleConfig {
    fn validate(&self) -> Result<(), SmcError> {
        if !(self.beta_tolerance > 0.0 && self.beta_tolerance < 1.0) {
            return Err(SmcError::config(
                "invalid-beta-tolerance",
                "beta_tolerance must lie in (0, 1)",
                "beta_tolerance",
                self.beta_tolerance,
            ));
        }
        if self.max_stages < 1 {
            return Err(SmcError::config(
                "invalid-max-stages",
                "max_stages must be at least 1",
                "max_stages",
                self.max_stages,
            ));
        }
        Ok(())
    }
}

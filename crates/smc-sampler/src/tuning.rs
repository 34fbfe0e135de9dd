use crate::config::{SmcConfig, TuningConfig};

/// Adapts the step count and proposal scale between stages.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTuner {
    tune_steps: bool,
    p_acc_rate: f64,
    max_steps: usize,
    draws: usize,
    scale: TuningConfig,
}

/// Initial proposal scale `min(1, 2.38 / sqrt(dim))`.
pub fn initial_scale(dim: usize) -> f64 {
    if dim == 0 {
        return 1.0;
    }
    (2.38 / (dim as f64).sqrt()).min(1.0)
}

impl StepTuner {
    /// Builds the tuner; the configured `n_steps` is the upper bound.
    pub fn from_config(config: &SmcConfig) -> Self {
        Self {
            tune_steps: config.tune_steps,
            p_acc_rate: config.p_acc_rate,
            max_steps: config.n_steps,
            draws: config.draws,
            scale: config.tuning.clone(),
        }
    }

    /// Step count for the next stage.
    ///
    /// Chooses the number of steps for which the probability of moving at
    /// least once reaches `p_acc_rate`, raised to at least 2 and then capped
    /// at the configured `n_steps`. The acceptance rate is floored at one
    /// acceptance per stage. Returns `n_steps` unchanged when tuning is
    /// disabled.
    pub fn tune_steps(&self, n_steps: usize, acc_rate: f64) -> usize {
        if !self.tune_steps {
            return n_steps;
        }
        let floor = 1.0 / (self.draws * n_steps.max(1)) as f64;
        let acc = acc_rate.max(floor);
        if acc >= 1.0 {
            return 2.min(self.max_steps);
        }
        let steps = ((1.0 - self.p_acc_rate).ln() / (1.0 - acc).ln()).floor();
        if !steps.is_finite() {
            return self.max_steps;
        }
        (steps.max(0.0) as usize).max(2).min(self.max_steps)
    }

    /// Proposal scale for the next stage: `scale * exp(acc_rate - target)`, clamped.
    pub fn tune_scale(&self, scale: f64, acc_rate: f64) -> f64 {
        let updated = scale * (acc_rate - self.scale.target_acc_rate).exp();
        updated.clamp(self.scale.min_scale, self.scale.max_scale)
    }
}

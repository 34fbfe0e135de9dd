use smc_core::errors::{ErrorInfo, SmcError};
use smc_core::RngHandle;

use crate::population::Population;
use crate::tempering::{finite_max, log_weights};

/// Reweights the population from `beta` to `beta_new`.
///
/// Normalizes the importance weights in place and returns the stage's log
/// marginal likelihood increment `ln(mean(w))`, computed as
/// `max + ln(mean(exp(lw - max)))`.
pub fn update_weights_beta(
    population: &mut Population,
    beta: f64,
    beta_new: f64,
) -> Result<f64, SmcError> {
    let log_w = log_weights(&population.log_likelihoods(), beta_new - beta);
    let Some(max) = finite_max(&log_w) else {
        return Err(SmcError::DegenerateWeights(
            ErrorInfo::new("all-weights-zero", "no particle carries a finite importance weight")
                .with_context("beta", beta.to_string())
                .with_context("beta_new", beta_new.to_string()),
        ));
    };
    let shifted: Vec<f64> = log_w.iter().map(|lw| (lw - max).exp()).collect();
    let sum: f64 = shifted.iter().sum();
    let n = shifted.len() as f64;
    let weights = shifted.into_iter().map(|w| w / sum).collect();
    population.set_weights(weights);
    Ok(max + (sum / n).ln())
}

/// Systematic resampling indices for offset `u` in `[0, 1)`.
///
/// Points `(u + k) / n` walk the cumulative weights; `u` is rescaled to the
/// first `1/n` stratum. Indices come out non-decreasing, and a zero-weight
/// entry is never selected while any weight is positive.
pub fn systematic_indices(weights: &[f64], u: f64) -> Vec<usize> {
    let n = weights.len();
    let mut indices = Vec::with_capacity(n);
    if n == 0 {
        return indices;
    }
    let mut cumulative = weights[0];
    let mut j = 0;
    let mut last_positive = (weights[0] > 0.0).then_some(0);
    for k in 0..n {
        let point = (u + k as f64) / n as f64;
        while (point > cumulative || weights[j] == 0.0) && j + 1 < n {
            j += 1;
            cumulative += weights[j];
            if weights[j] > 0.0 {
                last_positive = Some(j);
            }
        }
        // The cumulative sum can end a few ulps short of 1 and run past the
        // last positive weight.
        let index = if weights[j] > 0.0 { j } else { last_positive.unwrap_or(j) };
        indices.push(index);
    }
    indices
}

/// Replaces the population by a systematic resample and resets the weights to uniform.
///
/// Every selected particle keeps its cached log densities.
pub fn resample(population: &mut Population, rng: &mut RngHandle) {
    let indices = systematic_indices(population.weights(), rng.uniform());
    let particles = population.particles();
    let selected = indices.iter().map(|&i| particles[i].clone()).collect();
    population.replace_particles(selected);
}

use smc_core::errors::{ErrorInfo, SmcError};

const MAX_BISECTIONS: usize = 200;

/// Unnormalized log importance weights for a tempering increment `delta`.
///
/// Non-finite log likelihoods map to `-inf` (weight zero).
pub fn log_weights(log_likelihoods: &[f64], delta: f64) -> Vec<f64> {
    log_likelihoods
        .iter()
        .map(|&ll| {
            if ll.is_finite() {
                delta * ll
            } else {
                f64::NEG_INFINITY
            }
        })
        .collect()
}

/// Largest finite entry, if any.
pub(crate) fn finite_max(values: &[f64]) -> Option<f64> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

/// Effective sample size `(sum w)^2 / sum w^2` of log weights.
///
/// The weights are shifted by their maximum before exponentiation. Returns 0
/// when no weight is finite.
pub fn effective_sample_size(log_weights: &[f64]) -> f64 {
    let Some(max) = finite_max(log_weights) else {
        return 0.0;
    };
    let (sum, sum_sq) = log_weights.iter().fold((0.0, 0.0), |(s, sq), &lw| {
        let w = (lw - max).exp();
        (s + w, sq + w * w)
    });
    if sum_sq > 0.0 {
        sum * sum / sum_sq
    } else {
        0.0
    }
}

fn ess_at(log_likelihoods: &[f64], beta: f64, beta_new: f64) -> f64 {
    effective_sample_size(&log_weights(log_likelihoods, beta_new - beta))
}

/// Chooses the next inverse temperature.
///
/// The effective sample size target is `threshold * n`, capped at `n - 1` so
/// that a threshold of 1 still admits a finite step. Returns 1 when the full
/// step keeps the effective sample size at or above the target; otherwise bisects `[beta, 1]` until the bracket is
/// narrower than `tolerance` and returns its upper end, so the result is
/// strictly greater than `beta`.
pub fn next_beta(
    beta: f64,
    log_likelihoods: &[f64],
    threshold: f64,
    tolerance: f64,
) -> Result<f64, SmcError> {
    if beta >= 1.0 {
        return Ok(1.0);
    }
    if finite_max(log_likelihoods).is_none() {
        return Err(SmcError::DegenerateWeights(
            ErrorInfo::new("no-finite-likelihood", "every particle has a non-finite log likelihood")
                .with_context("beta", beta.to_string())
                .with_context("particles", log_likelihoods.len().to_string()),
        ));
    }
    let n = log_likelihoods.len() as f64;
    let target = (threshold * n).min(n - 1.0);
    if ess_at(log_likelihoods, beta, 1.0) >= target {
        return Ok(1.0);
    }

    let mut low = beta;
    let mut high = 1.0;
    let mut iterations = 0;
    while high - low > tolerance && iterations < MAX_BISECTIONS {
        let mid = 0.5 * (low + high);
        if ess_at(log_likelihoods, beta, mid) >= target {
            low = mid;
        } else {
            high = mid;
        }
        iterations += 1;
    }
    Ok(high.min(1.0))
}

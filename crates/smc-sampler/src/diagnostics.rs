use serde::{Deserialize, Serialize};

/// Per-dimension moments of one chain's posterior samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary {
    /// Sample mean per dimension.
    pub mean: Vec<f64>,
    /// Unbiased sample variance per dimension (0 for a single sample).
    pub variance: Vec<f64>,
}

/// Computes mean and variance of `samples` per dimension.
pub fn summarize(samples: &[Vec<f64>]) -> ChainSummary {
    let dim = samples.first().map_or(0, Vec::len);
    let n = samples.len() as f64;
    let mut mean = vec![0.0; dim];
    for sample in samples {
        for (m, x) in mean.iter_mut().zip(sample) {
            *m += x / n;
        }
    }
    let mut variance = vec![0.0; dim];
    if samples.len() > 1 {
        for sample in samples {
            for ((v, x), m) in variance.iter_mut().zip(sample).zip(&mean) {
                *v += (x - m).powi(2) / (n - 1.0);
            }
        }
    }
    ChainSummary { mean, variance }
}

/// Gelman-Rubin potential scale reduction per dimension.
///
/// `None` for a dimension when fewer than two chains or two draws per chain
/// are available, or when the within-chain variance vanishes.
pub fn gelman_rubin(chains: &[Vec<Vec<f64>>]) -> Vec<Option<f64>> {
    let dim = chains
        .first()
        .and_then(|chain| chain.first())
        .map_or(0, Vec::len);
    let draws = chains.iter().map(Vec::len).min().unwrap_or(0);
    if chains.len() < 2 || draws < 2 {
        return vec![None; dim];
    }
    let summaries: Vec<ChainSummary> = chains.iter().map(|c| summarize(&c[..draws])).collect();
    let m = chains.len() as f64;
    let n = draws as f64;
    (0..dim)
        .map(|d| {
            let within = summaries.iter().map(|s| s.variance[d]).sum::<f64>() / m;
            if within.is_nan() || within <= 0.0 {
                return None;
            }
            let grand = summaries.iter().map(|s| s.mean[d]).sum::<f64>() / m;
            let between = n / (m - 1.0)
                * summaries
                    .iter()
                    .map(|s| (s.mean[d] - grand).powi(2))
                    .sum::<f64>();
            let pooled = (n - 1.0) / n * within + between / n;
            Some((pooled / within).sqrt())
        })
        .collect()
}

use nalgebra::{DMatrix, DVector};
use smc_core::RngHandle;

use crate::population::Population;

/// Factor `L` applied to standard normal draws.
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalFactor {
    /// Lower Cholesky factor of the weighted covariance.
    Cholesky(DMatrix<f64>),
    /// Isotropic fallback `sqrt(var) * I`; holds the standard deviation.
    Scalar(f64),
}

/// Gaussian random-walk proposal adapted from the weighted population.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    covariance: DMatrix<f64>,
    factor: ProposalFactor,
}

/// Weighted empirical covariance of the particle positions.
///
/// Uses the unbiased `1 / (1 - sum w^2)` correction when it is defined and
/// the plain weighted estimator otherwise.
pub fn weighted_covariance(positions: &[Vec<f64>], weights: &[f64]) -> DMatrix<f64> {
    let dim = positions.first().map_or(0, Vec::len);
    let mut mean = DVector::<f64>::zeros(dim);
    for (position, &w) in positions.iter().zip(weights) {
        mean += DVector::from_column_slice(position) * w;
    }
    let mut scatter = DMatrix::<f64>::zeros(dim, dim);
    for (position, &w) in positions.iter().zip(weights) {
        if w == 0.0 {
            continue;
        }
        let centred = DVector::from_column_slice(position) - &mean;
        scatter += &centred * centred.transpose() * w;
    }
    let sum_sq: f64 = weights.iter().map(|w| w * w).sum();
    let correction = 1.0 - sum_sq;
    if correction > f64::EPSILON {
        scatter / correction
    } else {
        scatter
    }
}

impl Proposal {
    /// Unit isotropic proposal for a `dim`-dimensional space.
    pub fn isotropic(dim: usize) -> Self {
        Self {
            covariance: DMatrix::identity(dim, dim),
            factor: ProposalFactor::Scalar(1.0),
        }
    }

    /// Adapts the proposal to the weighted (pre-resample) population.
    pub fn from_population(population: &Population) -> Self {
        let covariance = weighted_covariance(&population.positions(), population.weights());
        Self::from_covariance(covariance)
    }

    /// Factorizes `covariance`, falling back to a scalar variance when
    /// Cholesky fails or the space is one-dimensional.
    pub fn from_covariance(covariance: DMatrix<f64>) -> Self {
        let dim = covariance.nrows();
        let finite = covariance.iter().all(|v| v.is_finite());
        if dim > 1 && finite {
            if let Some(cholesky) = covariance.clone().cholesky() {
                return Self {
                    factor: ProposalFactor::Cholesky(cholesky.l()),
                    covariance,
                };
            }
        }
        let variance = if dim == 0 {
            1.0
        } else {
            let mean_diag = covariance.diagonal().sum() / dim as f64;
            if mean_diag.is_finite() && mean_diag > 0.0 {
                mean_diag
            } else {
                1.0
            }
        };
        Self {
            factor: ProposalFactor::Scalar(variance.sqrt()),
            covariance,
        }
    }

    /// Weighted covariance the proposal was built from.
    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Factor applied to standard normal draws.
    pub fn factor(&self) -> &ProposalFactor {
        &self.factor
    }

    /// Whether a multivariate covariance had to be replaced by the scalar fallback.
    pub fn is_fallback(&self) -> bool {
        self.covariance.nrows() > 1 && matches!(self.factor, ProposalFactor::Scalar(_))
    }

    /// Proposes `position + scale * L z` with `z` standard normal.
    pub fn perturb(&self, position: &[f64], scale: f64, rng: &mut RngHandle) -> Vec<f64> {
        let dim = position.len();
        let z = DVector::from_iterator(dim, (0..dim).map(|_| rng.standard_normal()));
        let step = match &self.factor {
            ProposalFactor::Cholesky(l) => l * z,
            ProposalFactor::Scalar(std) => z * *std,
        };
        position
            .iter()
            .zip(step.iter())
            .map(|(x, dx)| x + scale * dx)
            .collect()
    }
}

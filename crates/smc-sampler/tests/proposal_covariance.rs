use nalgebra::DMatrix;
use smc_core::{Evaluation, RngHandle};
use smc_sampler::proposal::{weighted_covariance, Proposal, ProposalFactor};
use smc_sampler::{Particle, Population};

fn population(positions: &[[f64; 2]]) -> Population {
    let particles = positions
        .iter()
        .map(|p| {
            Particle::new(
                p.to_vec(),
                Evaluation {
                    log_prior: 0.0,
                    log_likelihood: 0.0,
                },
            )
        })
        .collect();
    Population::from_particles(particles).unwrap()
}

#[test]
fn uniform_weights_give_unbiased_sample_covariance() {
    let positions = vec![vec![0.0, 1.0], vec![2.0, 1.0], vec![4.0, 4.0]];
    let weights = vec![1.0 / 3.0; 3];
    let cov = weighted_covariance(&positions, &weights);
    // Sample covariance with n - 1 = 2 in the denominator.
    assert!((cov[(0, 0)] - 4.0).abs() < 1e-12);
    assert!((cov[(1, 1)] - 3.0).abs() < 1e-12);
    assert!((cov[(0, 1)] - 3.0).abs() < 1e-12);
    assert!((cov[(0, 1)] - cov[(1, 0)]).abs() < 1e-15);
}

#[test]
fn single_weight_falls_back_to_biased_estimator() {
    let positions = vec![vec![1.0], vec![3.0]];
    let cov = weighted_covariance(&positions, &[1.0, 0.0]);
    assert_eq!(cov[(0, 0)], 0.0);
}

#[test]
fn well_conditioned_population_uses_cholesky() {
    let pop = population(&[[0.0, 1.0], [2.0, 1.0], [4.0, 4.0], [1.0, -2.0]]);
    let proposal = Proposal::from_population(&pop);
    assert!(!proposal.is_fallback());
    let ProposalFactor::Cholesky(l) = proposal.factor() else {
        panic!("expected a Cholesky factor");
    };
    let rebuilt = l * l.transpose();
    assert!((rebuilt - proposal.covariance()).amax() < 1e-10);
}

#[test]
fn degenerate_dimension_falls_back_to_scalar_variance() {
    let pop = population(&[[0.0, 5.0], [1.0, 5.0], [2.0, 5.0]]);
    let proposal = Proposal::from_population(&pop);
    assert!(proposal.is_fallback());
    let ProposalFactor::Scalar(sd) = proposal.factor() else {
        panic!("expected scalar fallback");
    };
    assert!((sd - 0.5f64.sqrt()).abs() < 1e-12);
}

#[test]
fn collapsed_population_uses_unit_variance() {
    let proposal = Proposal::from_covariance(DMatrix::zeros(3, 3));
    assert_eq!(proposal.factor(), &ProposalFactor::Scalar(1.0));
}

#[test]
fn one_dimensional_proposal_is_scalar() {
    let proposal = Proposal::from_covariance(DMatrix::from_element(1, 1, 4.0));
    assert_eq!(proposal.factor(), &ProposalFactor::Scalar(2.0));
    assert!(!proposal.is_fallback());
}

#[test]
fn zero_scale_perturbation_is_identity() {
    let proposal = Proposal::isotropic(3);
    let mut rng = RngHandle::from_seed(3);
    let position = [0.5, -1.0, 2.0];
    assert_eq!(proposal.perturb(&position, 0.0, &mut rng), position.to_vec());
}

#[test]
fn perturbation_spread_matches_covariance() {
    let proposal = Proposal::from_covariance(DMatrix::from_row_slice(2, 2, &[4.0, 0.0, 0.0, 0.25]));
    let mut rng = RngHandle::from_seed(11);
    let draws: Vec<Vec<f64>> = (0..20_000)
        .map(|_| proposal.perturb(&[0.0, 0.0], 1.0, &mut rng))
        .collect();
    let var = |d: usize| draws.iter().map(|x| x[d] * x[d]).sum::<f64>() / draws.len() as f64;
    assert!((var(0) - 4.0).abs() < 0.2);
    assert!((var(1) - 0.25).abs() < 0.02);
}

mod common;

use common::{mean, small_config, GaussianModel, GaussianSimulator};
use smc_core::SmcError;
use smc_sampler::kernel::{AbcTarget, Target};
use smc_sampler::{
    sample_smc, sample_smc_abc, sample_smc_abc_with_start, DistanceKernel, KernelConfig,
    SmcConfig, SummaryStatistic,
};

fn abc_config(draws: usize, epsilon: f64, sum_stat: SummaryStatistic) -> SmcConfig {
    SmcConfig {
        kernel: KernelConfig::Abc {
            epsilon,
            sum_stat,
            distance: DistanceKernel::Gaussian,
        },
        ..small_config(draws, 1, 77)
    }
}

#[test]
fn summary_statistics() {
    let data = [3.0, 1.0, 2.0, 10.0];
    assert_eq!(SummaryStatistic::Identity.apply(&data), data.to_vec());
    assert_eq!(SummaryStatistic::Sorted.apply(&data), vec![1.0, 2.0, 3.0, 10.0]);
    assert_eq!(SummaryStatistic::Mean.apply(&data), vec![4.0]);
    assert_eq!(SummaryStatistic::Median.apply(&data), vec![2.5]);
    assert_eq!(SummaryStatistic::Median.apply(&[5.0, 1.0, 3.0]), vec![3.0]);
    assert!(SummaryStatistic::Mean.apply(&[]).is_empty());
}

#[test]
fn gaussian_kernel_pseudo_likelihood() {
    let kernel = DistanceKernel::Gaussian;
    assert_eq!(kernel.log_kernel(&[1.0, 2.0], &[1.0, 2.0], 0.5), 0.0);
    assert_eq!(kernel.log_kernel(&[1.0], &[2.0], 0.5), -2.0);
    assert_eq!(kernel.log_kernel(&[1.0], &[1.0, 2.0], 0.5), f64::NEG_INFINITY);
}

#[test]
fn abc_target_summarizes_observed_once() {
    let simulator = GaussianSimulator::with_mean_one();
    let target = AbcTarget::new(&simulator, SummaryStatistic::Mean, DistanceKernel::Gaussian, 0.1);
    assert_eq!(target.observed_summary(), &[1.0]);
    assert_eq!(target.dim(), 1);
}

#[test]
fn abc_posterior_concentrates_near_observed_mean() {
    let simulator = GaussianSimulator::with_mean_one();
    let config = abc_config(300, 0.1, SummaryStatistic::Mean);
    let run = sample_smc_abc(&config, &simulator).unwrap();
    let chain = &run.chains[0];
    assert_eq!(chain.betas.last().copied(), Some(1.0));
    let posterior_mean = mean(chain.posterior_samples.iter().map(|s| s[0]));
    assert!((posterior_mean - 0.94).abs() < 0.15, "mean {posterior_mean}");
}

#[test]
fn abc_runs_are_reproducible() {
    let simulator = GaussianSimulator::with_mean_one();
    let config = abc_config(100, 0.5, SummaryStatistic::Sorted);
    let a = sample_smc_abc(&config, &simulator).unwrap();
    let b = sample_smc_abc(&config, &simulator).unwrap();
    assert_eq!(a.chains, b.chains);
}

#[test]
fn abc_accepts_start_population() {
    let simulator = GaussianSimulator::with_mean_one();
    let config = abc_config(40, 0.5, SummaryStatistic::Mean);
    let start = vec![vec![vec![1.0]; 40]];
    let run = sample_smc_abc_with_start(&config, &simulator, &start).unwrap();
    assert_eq!(run.chains[0].posterior_samples.len(), 40);
}

#[test]
fn kernel_must_match_entry_point() {
    let simulator = GaussianSimulator::with_mean_one();
    let err = sample_smc_abc(&small_config(10, 1, 1), &simulator).unwrap_err();
    assert!(matches!(err, SmcError::Configuration(_)));
    assert_eq!(err.info().code, "kernel-mismatch");

    let model = GaussianModel::standard(1);
    let err = sample_smc(&abc_config(10, 1.0, SummaryStatistic::Identity), &model).unwrap_err();
    assert_eq!(err.info().code, "kernel-mismatch");
}

#[test]
fn non_positive_epsilon_is_rejected() {
    let simulator = GaussianSimulator::with_mean_one();
    let err = sample_smc_abc(&abc_config(10, 0.0, SummaryStatistic::Mean), &simulator).unwrap_err();
    assert_eq!(err.info().code, "invalid-epsilon");
}

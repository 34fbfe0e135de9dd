mod common;

use common::{small_config, GaussianModel};
use smc_sampler::diagnostics::{gelman_rubin, summarize};
use smc_sampler::{sample_smc, RunReport};

#[test]
fn summaries_use_unbiased_variance() {
    let summary = summarize(&[vec![1.0, 0.0], vec![3.0, 0.0]]);
    assert_eq!(summary.mean, vec![2.0, 0.0]);
    assert_eq!(summary.variance, vec![2.0, 0.0]);
}

#[test]
fn gelman_rubin_detects_disagreeing_chains() {
    let chain = |offset: f64| -> Vec<Vec<f64>> {
        (0..100).map(|i| vec![offset + (i % 10) as f64 / 10.0]).collect()
    };
    let agree = gelman_rubin(&[chain(0.0), chain(0.0)]);
    let disagree = gelman_rubin(&[chain(0.0), chain(5.0)]);
    assert!((agree[0].unwrap() - 1.0).abs() < 0.01);
    assert!(disagree[0].unwrap() > 2.0);
    assert_eq!(gelman_rubin(&[chain(0.0)]), vec![None]);
}

#[test]
fn report_roundtrip_through_json() {
    let model = GaussianModel::standard(2);
    let config = small_config(100, 2, 4);
    let run = sample_smc(&config, &model).unwrap();
    let report = RunReport::from_run(&config, &run);
    assert_eq!(report.chains.len(), 2);
    assert_eq!(report.r_hat.len(), 2);
    assert!(report.r_hat.iter().all(Option::is_some));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("report.json");
    report.write(&path).unwrap();
    let loaded = RunReport::load(&path).unwrap();

    assert_eq!(loaded.master_seed, report.master_seed);
    assert_eq!(loaded.config.draws, config.draws);
    assert_eq!(loaded.config.random_seed, config.random_seed);
    for (a, b) in loaded.chains.iter().zip(&report.chains) {
        assert_eq!(a.seed, b.seed);
        assert_eq!(a.stages, b.stages);
        assert_eq!(a.nsteps, b.nsteps);
        assert!((a.log_marginal_likelihood - b.log_marginal_likelihood).abs() < 1e-12);
        assert_eq!(a.summary.mean.len(), 2);
    }
}

#[test]
fn loading_garbage_is_a_serde_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    std::fs::write(&path, "not json").unwrap();
    let err = RunReport::load(&path).unwrap_err();
    assert_eq!(err.info().code, "report-parse");
}

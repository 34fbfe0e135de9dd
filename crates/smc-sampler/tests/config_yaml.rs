use smc_core::SmcError;
use smc_sampler::{KernelConfig, SeedSpec, SmcConfig, SummaryStatistic};

#[test]
fn empty_document_yields_defaults() {
    let config = SmcConfig::from_yaml_str("{}").unwrap();
    assert_eq!(config, SmcConfig::default());
    assert_eq!(config.draws, 2000);
    assert_eq!(config.n_steps, 25);
    assert!(config.tune_steps);
    assert_eq!(config.p_acc_rate, 0.99);
    assert_eq!(config.threshold, 0.5);
    assert_eq!(config.kernel, KernelConfig::Metropolis);
    assert_eq!(config.tuning.target_acc_rate, 0.234);
    assert_eq!(config.schedule.max_stages, 10_000);
}

#[test]
fn abc_kernel_and_seed_list_parse() {
    let yaml = r#"
draws: 400
chains: 2
kernel:
  type: abc
  epsilon: 0.25
  sum_stat: median
random_seed: [11, 12]
"#;
    let config = SmcConfig::from_yaml_str(yaml).unwrap();
    assert_eq!(config.draws, 400);
    assert_eq!(config.random_seed, Some(SeedSpec::PerChain(vec![11, 12])));
    match config.kernel {
        KernelConfig::Abc { epsilon, sum_stat, .. } => {
            assert_eq!(epsilon, 0.25);
            assert_eq!(sum_stat, SummaryStatistic::Median);
        }
        KernelConfig::Metropolis => panic!("expected the abc kernel"),
    }
}

#[test]
fn single_seed_parses_as_master_seed() {
    let config = SmcConfig::from_yaml_str("random_seed: 42\n").unwrap();
    assert_eq!(config.random_seed, Some(SeedSpec::Single(42)));
}

#[test]
fn invalid_values_are_rejected_after_parsing() {
    let err = SmcConfig::from_yaml_str("p_acc_rate: 1.0\n").unwrap_err();
    assert!(matches!(err, SmcError::Configuration(_)));
    let err = SmcConfig::from_yaml_str("tuning:\n  min_scale: 2.0\n  max_scale: 1.0\n").unwrap_err();
    assert_eq!(err.info().code, "invalid-scale-bounds");
    let err = SmcConfig::from_yaml_str("draws: [1, 2]\n").unwrap_err();
    assert!(matches!(err, SmcError::Serde(_)));
}

#[test]
fn load_reads_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smc.yaml");
    std::fs::write(&path, "draws: 64\nthreshold: 0.7\n").unwrap();
    let config = SmcConfig::load(&path).unwrap();
    assert_eq!(config.draws, 64);
    assert_eq!(config.threshold, 0.7);

    let err = SmcConfig::load(&dir.path().join("missing.yaml")).unwrap_err();
    assert_eq!(err.info().code, "config-read");
    assert!(err.info().context.contains_key("path"));
}

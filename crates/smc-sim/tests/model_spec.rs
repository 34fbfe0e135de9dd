use std::f64::consts::PI;

use smc_core::{Model, Prior, RngHandle, Simulator, SmcError};
use smc_sim::model::{LikelihoodSpec, ModelSpec};

const MODEL_YAML: &str = r#"
priors:
  - dist: normal
    mu: 0.0
    tau: 1.0
  - dist: half_normal
    tau: 1.0
likelihood:
  type: gaussian
  observed: [0.5, 1.5]
  sigma: 2.0
"#;

#[test]
fn yaml_model_parses_registry_priors() {
    let spec = ModelSpec::from_yaml_str(MODEL_YAML).unwrap();
    assert_eq!(spec.dim(), 2);
    assert_eq!(spec.priors.components()[1].name(), "half_normal");
    let LikelihoodSpec::Gaussian { mean_index, .. } = &spec.likelihood;
    assert_eq!(*mean_index, 0);
}

#[test]
fn gaussian_likelihood_matches_closed_form() {
    let spec = ModelSpec::from_yaml_str(MODEL_YAML).unwrap();
    let norm = -0.5 * (2.0 * PI * 4.0).ln();
    let expected = 2.0 * norm - 0.5 * (0.25 / 4.0) * 2.0;
    let ll = spec.log_likelihood(&[1.0, 0.3]).unwrap();
    assert!((ll - expected).abs() < 1e-12);
    let evaluation = spec.evaluate(&[1.0, -0.3]).unwrap();
    assert_eq!(evaluation.log_prior, f64::NEG_INFINITY);
}

#[test]
fn simulator_matches_observation_count() {
    let spec = ModelSpec::from_yaml_str(MODEL_YAML).unwrap();
    let mut rng = RngHandle::from_seed(1);
    assert_eq!(spec.simulate(&[0.0, 1.0], &mut rng).unwrap().len(), 2);
    assert_eq!(spec.observed(), &[0.5, 1.5]);
}

#[test]
fn invalid_models_are_rejected() {
    let bad_sigma = MODEL_YAML.replace("sigma: 2.0", "sigma: -1.0");
    let err = ModelSpec::from_yaml_str(&bad_sigma).unwrap_err();
    assert_eq!(err.info().code, "invalid-sigma");

    let bad_index = format!("{MODEL_YAML}  mean_index: 5\n");
    let err = ModelSpec::from_yaml_str(&bad_index).unwrap_err();
    assert_eq!(err.info().code, "invalid-mean-index");

    let bad_prior = MODEL_YAML.replace("tau: 1.0\n  - dist", "tau: 0.0\n  - dist");
    let err = ModelSpec::from_yaml_str(&bad_prior).unwrap_err();
    assert!(matches!(err, SmcError::Configuration(_)));
    assert_eq!(err.info().context["component"], "0");

    let err = ModelSpec::from_yaml_str("priors: {}").unwrap_err();
    assert!(matches!(err, SmcError::Serde(_)));
}

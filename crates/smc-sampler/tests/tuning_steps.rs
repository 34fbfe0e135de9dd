use smc_sampler::tuning::{initial_scale, StepTuner};
use smc_sampler::SmcConfig;

fn tuner(tune_steps: bool) -> StepTuner {
    tuner_with_max(tune_steps, 25)
}

fn tuner_with_max(tune_steps: bool, n_steps: usize) -> StepTuner {
    StepTuner::from_config(&SmcConfig {
        draws: 100,
        n_steps,
        tune_steps,
        ..SmcConfig::default()
    })
}

#[test]
fn disabled_tuning_keeps_step_count() {
    assert_eq!(tuner(false).tune_steps(25, 0.01), 25);
    assert_eq!(tuner(false).tune_steps(7, 0.9), 7);
}

#[test]
fn steps_reach_the_move_probability() {
    // ln(0.01) / ln(0.5) = 6.64
    assert_eq!(tuner(true).tune_steps(25, 0.5), 6);
    // ln(0.01) / ln(0.8) = 20.6
    assert_eq!(tuner(true).tune_steps(25, 0.2), 20);
}

#[test]
fn steps_are_clamped() {
    assert_eq!(tuner(true).tune_steps(25, 0.0), 25);
    assert_eq!(tuner(true).tune_steps(25, 0.999), 2);
    assert_eq!(tuner(true).tune_steps(25, 1.0), 2);
}

#[test]
fn configured_maximum_caps_below_two() {
    let tuner = tuner_with_max(true, 1);
    assert_eq!(tuner.tune_steps(1, 0.5), 1);
    assert_eq!(tuner.tune_steps(1, 0.0), 1);
    assert_eq!(tuner.tune_steps(1, 1.0), 1);
    assert_eq!(tuner_with_max(true, 3).tune_steps(3, 0.2), 3);
}

#[test]
fn scale_follows_acceptance() {
    let tuner = tuner(true);
    assert!(tuner.tune_scale(0.5, 0.6) > 0.5);
    assert!(tuner.tune_scale(0.5, 0.05) < 0.5);
    assert!((tuner.tune_scale(0.5, 0.234) - 0.5).abs() < 1e-15);
    assert_eq!(tuner.tune_scale(9.9, 1.0), 10.0);
    assert_eq!(tuner.tune_scale(1e-4, 0.0), 1e-4);
}

#[test]
fn initial_scale_shrinks_with_dimension() {
    assert_eq!(initial_scale(1), 1.0);
    assert_eq!(initial_scale(4), 1.0);
    assert!((initial_scale(16) - 0.595).abs() < 1e-12);
}

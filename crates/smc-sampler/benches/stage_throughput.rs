use std::f64::consts::PI;

use criterion::{criterion_group, criterion_main, Criterion};
use smc_core::distributions::Normal;
use smc_core::{Evaluation, IndependentPrior, Model, Prior, RngHandle, SmcError};
use smc_sampler::kernel::{mutate, ExactTarget, MutationSettings, Target};
use smc_sampler::proposal::Proposal;
use smc_sampler::{sample_smc, Particle, Population, SeedSpec, SmcConfig};

struct Gaussian {
    prior: IndependentPrior,
}

impl Gaussian {
    fn new(dim: usize) -> Self {
        let components = (0..dim)
            .map(|_| Normal::new(0.0, 1.0).unwrap().into())
            .collect();
        Self {
            prior: IndependentPrior::new(components).unwrap(),
        }
    }
}

impl Prior for Gaussian {
    fn dim(&self) -> usize {
        self.prior.dim()
    }

    fn sample_prior(&self, rng: &mut RngHandle) -> Result<Vec<f64>, SmcError> {
        self.prior.sample_prior(rng)
    }

    fn log_prior(&self, position: &[f64]) -> Result<f64, SmcError> {
        self.prior.log_prior(position)
    }
}

impl Model for Gaussian {
    fn log_likelihood(&self, position: &[f64]) -> Result<f64, SmcError> {
        let norm = -0.5 * (2.0 * PI * 0.04).ln();
        Ok(position.iter().map(|x| norm - 0.5 * (x / 0.2).powi(2)).sum())
    }
}

fn population(target: &impl Target, draws: usize) -> Population {
    let mut rng = RngHandle::from_seed(1);
    let particles = (0..draws)
        .map(|_| {
            let position = target.sample_prior(&mut rng).unwrap();
            let evaluation: Evaluation = target.evaluate(&position, &mut rng).unwrap();
            Particle::new(position, evaluation)
        })
        .collect();
    Population::from_particles(particles).unwrap()
}

fn bench_mutation(c: &mut Criterion) {
    let model = Gaussian::new(4);
    let target = ExactTarget::new(&model);
    let initial = population(&target, 1000);
    let proposal = Proposal::from_population(&initial);
    for parallel in [false, true] {
        let settings = MutationSettings {
            beta: 0.3,
            scale: 0.5,
            n_steps: 10,
            chain_seed: 9,
            stage: 1,
            parallel,
        };
        let name = if parallel { "mutate_parallel" } else { "mutate_sequential" };
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut pop = initial.clone();
                mutate(&target, &mut pop, &proposal, &settings).unwrap()
            })
        });
    }
}

fn bench_full_run(c: &mut Criterion) {
    let model = Gaussian::new(2);
    let config = SmcConfig {
        draws: 500,
        chains: Some(2),
        cores: Some(2),
        random_seed: Some(SeedSpec::Single(3)),
        ..SmcConfig::default()
    };
    c.bench_function("sample_smc_two_chains", |b| {
        b.iter(|| sample_smc(&config, &model).unwrap())
    });
}

criterion_group!(benches, bench_mutation, bench_full_run);
criterion_main!(benches);

use smc_core::{derive_substream_seed, RngHandle, SmcError};

use crate::config::SeedSpec;

/// Derives the deterministic seed used for a specific chain.
pub fn chain_seed(master_seed: u64, chain: usize) -> u64 {
    derive_substream_seed(master_seed, chain as u64)
}

/// Derives the seed for mutating one particle during one stage.
///
/// Depends only on `(chain_seed, stage, particle)`, never on scheduling, so
/// concurrent and sequential mutation consume identical streams.
pub fn mutation_seed(chain_seed: u64, stage: usize, particle: usize) -> u64 {
    let intermediate = derive_substream_seed(chain_seed, (stage as u64) << 32 | 0x4D55);
    derive_substream_seed(intermediate, particle as u64)
}

/// Derives the seed for the chain-level stream (prior draws and resampling).
pub fn driver_seed(chain_seed: u64) -> u64 {
    derive_substream_seed(chain_seed ^ 0xA5A5_A5A5_A5A5_A5A5, 0)
}

/// Resolves the master seed and one seed per chain.
///
/// Without a seed policy the master seed is drawn from system entropy so it
/// can be recorded and the run replayed.
pub fn resolve_chain_seeds(
    spec: Option<&SeedSpec>,
    chains: usize,
) -> Result<(u64, Vec<u64>), SmcError> {
    match spec {
        Some(SeedSpec::PerChain(seeds)) => {
            if seeds.len() != chains {
                return Err(SmcError::config(
                    "seed-count-mismatch",
                    "one seed is required per chain",
                    "seeds",
                    seeds.len(),
                )
                .with_context("chains", chains.to_string()));
            }
            let master = seeds.first().copied().unwrap_or_default();
            Ok((master, seeds.clone()))
        }
        Some(SeedSpec::Single(master)) => Ok((*master, derive_all(*master, chains))),
        None => {
            let master = rand::RngCore::next_u64(&mut RngHandle::from_entropy());
            Ok((master, derive_all(master, chains)))
        }
    }
}

fn derive_all(master: u64, chains: usize) -> Vec<u64> {
    (0..chains).map(|chain| chain_seed(master, chain)).collect()
}

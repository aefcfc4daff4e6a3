//! Deterministic pseudo-random draws for elections.
//!
//! The draw is keyed on (master seed, turn, district) by mixing the three
//! into a ChaCha8 seed, so a given scenario seed reproduces the same
//! election outcomes while different turns and seats stay decorrelated.
//! This is the documented replacement for a sine-hash style draw; no
//! bit-exact parity with any other sequence is intended.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::world::DistrictId;

fn derive_seed(master_seed: u64, turn: u64, entity: u64) -> u64 {
    let mut seed = master_seed;
    seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed ^= turn.wrapping_mul(69069);
    seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    seed ^= entity.wrapping_mul(48271);
    seed
}

pub fn election_rng(master_seed: u64, turn: u64, district: DistrictId) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(derive_seed(master_seed, turn, district.raw() as u64))
}

/// Uniform draw in [0, 1) for one seat's election.
pub fn election_draw(master_seed: u64, turn: u64, district: DistrictId) -> f64 {
    election_rng(master_seed, turn, district).gen::<f64>()
}

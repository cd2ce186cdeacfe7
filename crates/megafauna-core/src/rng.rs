use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Multiplier to spread derived seeds apart.
const RNG_DERIVATION_PRIME: u64 = 2_654_435_761;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Derive an independent RNG stream for one simulation unit, so that units
/// stay reproducible regardless of how many others exist.
pub fn derive_unit_rng(base_seed: u64, unit_index: usize) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(base_seed.wrapping_add(unit_index as u64 * RNG_DERIVATION_PRIME))
}

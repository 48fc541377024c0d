//! Reproducible per-run seed sequence

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Smallest seed handed to a run
pub const SEED_MIN: u64 = 1;

/// Largest seed handed to a run
pub const SEED_MAX: u64 = 1000;

/// Draw `run_count` split seeds from `master_seed`.
///
/// The whole sequence is generated up front so that run `i` always sees the
/// same seed regardless of how earlier runs ended. Seeds may repeat.
///
/// ```rust
/// use wq_bench::seeds::generate_seeds;
///
/// let a = generate_seeds(42, 5);
/// assert_eq!(a.len(), 5);
/// assert_eq!(a, generate_seeds(42, 5));
/// ```
#[must_use]
pub fn generate_seeds(master_seed: u64, run_count: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(master_seed);
    (0..run_count)
        .map(|_| rng.gen_range(SEED_MIN..=SEED_MAX))
        .collect()
}

//! Deterministic randomness for reproducible tests

use mnlist_types::app::Hash256;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Deterministic random number generator for tests
pub struct TestRng {
    /// Internal RNG with fixed seed
    rng: StdRng,
}

impl TestRng {
    /// Create a new test RNG with the specified seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create a test RNG with the default seed 12345
    pub fn with_default_seed() -> Self {
        Self::new(12345)
    }

    /// Fill a buffer with random bytes
    pub fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }

    /// Generate a random value
    pub fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    /// Generate a random value
    pub fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    /// Generate a value in `[low, high)`
    pub fn gen_range(&mut self, low: u64, high: u64) -> u64 {
        self.rng.gen_range(low..high)
    }

    /// Returns true with probability `p`
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p)
    }

    /// Generate a random 32-byte hash
    pub fn gen_hash(&mut self) -> Hash256 {
        let mut bytes = [0u8; 32];
        self.rng.fill_bytes(&mut bytes);
        Hash256(bytes)
    }
}

impl Default for TestRng {
    fn default() -> Self {
        Self::with_default_seed()
    }
}

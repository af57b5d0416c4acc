//! Linear-congruential generator
//!
//! `state = (state * 9301 + 49297) mod 233280`, `value = state / 233280`.
//! The sequence is tiny and statistically weak, but identical seeds always
//! give identical detection layouts, which is all the pipeline needs.

use rand::{Error, RngCore, SeedableRng};

const MULTIPLIER: u64 = 9301;
const INCREMENT: u64 = 49297;
const MODULUS: u64 = 233_280;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededLcg {
    state: u64,
}

impl SeededLcg {
    /// Negative seeds wrap into the modulus
    pub fn new(seed: i64) -> Self {
        Self {
            state: seed.rem_euclid(MODULUS as i64) as u64,
        }
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    /// Next value in `[0, 1)`
    pub fn next_unit(&mut self) -> f64 {
        self.state = (self.state * MULTIPLIER + INCREMENT) % MODULUS;
        self.state as f64 / MODULUS as f64
    }

    /// Next value in `[low, high)`
    pub fn next_in(&mut self, low: f64, high: f64) -> f64 {
        low + self.next_unit() * (high - low)
    }

    /// Next value in `[-0.5, 0.5)`
    pub fn next_centered(&mut self) -> f64 {
        self.next_unit() - 0.5
    }

    /// `true` with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }
}

impl RngCore for SeededLcg {
    fn next_u32(&mut self) -> u32 {
        (self.next_unit() * 4_294_967_296.0) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let high = self.next_u32() as u64;
        let low = self.next_u32() as u64;
        (high << 32) | low
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for SeededLcg {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(i64::from_le_bytes(seed))
    }
}

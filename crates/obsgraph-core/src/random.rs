//! Injectable randomness
//!
//! Every random draw in the stack goes through [`RandomSource`], so callers can
//! seed it, or replace it with a fixed sequence in tests.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use uuid::Uuid;

pub trait RandomSource {
    /// Uniform draw from `[0, 1)`
    fn next_f64(&mut self) -> f64;

    fn next_u64(&mut self) -> u64;

    /// Uniform index in `0..upper`; `upper` must be non-zero
    fn below(&mut self, upper: usize) -> usize {
        debug_assert!(upper > 0, "below() needs a non-empty range");
        ((self.next_f64() * upper as f64) as usize).min(upper.saturating_sub(1))
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.below(items.len())])
        }
    }

    /// Random (v4) uuid built from this source's bits
    fn uuid(&mut self) -> Uuid {
        let bits = (u128::from(self.next_u64()) << 64) | u128::from(self.next_u64());
        uuid::Builder::from_random_bytes(bits.to_be_bytes()).into_uuid()
    }
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }

    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// [`RandomSource`] backed by any `rand` generator
#[derive(Debug, Clone)]
pub struct RngSource<R = StdRng>(R);

impl RngSource<StdRng> {
    /// Reproducible source
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl<R: RngCore> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_f64(&mut self) -> f64 {
        self.0.gen::<f64>()
    }

    fn next_u64(&mut self) -> u64 {
        self.0.next_u64()
    }
}

/// Replays a fixed list of `[0, 1)` values, cycling when exhausted
#[derive(Debug, Clone)]
pub struct SequenceSource {
    values: Vec<f64>,
    position: usize,
}

impl SequenceSource {
    pub fn new(values: Vec<f64>) -> Self {
        let values = if values.is_empty() { vec![0.0] } else { values };
        Self { values, position: 0 }
    }

    /// Always yields the same value
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws made so far
    pub fn draws(&self) -> usize {
        self.position
    }
}

impl RandomSource for SequenceSource {
    fn next_f64(&mut self) -> f64 {
        let value = self.values[self.position % self.values.len()];
        self.position += 1;
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }

    fn next_u64(&mut self) -> u64 {
        (self.next_f64() * u64::MAX as f64) as u64
    }
}

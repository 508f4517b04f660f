//! Pseudorandom source shared by selection and transform sampling.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of uniform random draws.
///
/// The engine owns one source for its lifetime. Tests substitute a seeded
/// generator to make selection and sampling reproducible.
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    /// Uniform draw in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }

    /// Uniform draw in `[min, max)`. Bounds may be given in either order.
    fn uniform(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_f64()
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "index() on an empty range");
        ((self.next_f64() * len as f64) as usize).min(len.saturating_sub(1))
    }
}

/// Small xorshift64 generator.
#[derive(Debug, Clone)]
pub struct XorShiftRng(u64);

impl XorShiftRng {
    pub fn new(seed: u64) -> Self {
        // xorshift gets stuck on a zero state
        Self(seed.wrapping_add(0x9E37_79B9_7F4A_7C15).max(1))
    }

    /// Seeds from the system clock.
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5EED);
        Self::new(nanos)
    }
}

impl RandomSource for XorShiftRng {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
}

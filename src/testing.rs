//! Randomness doubles for deterministic tests.
//!
//! Public so integration tests and downstream callers can pin rolls. Nothing
//! in the engine itself depends on this module.

use rand::{Error, RngCore};

const F64_MANTISSA_BITS: u32 = 53;

/// A generator whose every `gen::<f64>()` yields the same chosen value.
///
/// `rand` builds a unit `f64` from the top 53 bits of `next_u64`, so the
/// value is stored pre-shifted. Integer draws are meaningless here.
#[derive(Debug, Clone, Copy)]
pub struct FixedRoll {
    raw: u64,
}

impl FixedRoll {
    /// `value` is clamped into `[0, 1)`.
    pub fn new(value: f64) -> Self {
        let scale = (1u64 << F64_MANTISSA_BITS) as f64;
        let max_fraction = (1u64 << F64_MANTISSA_BITS) - 1;
        let fraction = ((value.max(0.0) * scale) as u64).min(max_fraction);
        Self {
            raw: fraction << (64 - F64_MANTISSA_BITS),
        }
    }
}

impl RngCore for FixedRoll {
    fn next_u32(&mut self) -> u32 {
        (self.raw >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.raw
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let bytes = self.raw.to_le_bytes();
        for chunk in dest.chunks_mut(bytes.len()) {
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

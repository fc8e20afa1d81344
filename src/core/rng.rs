//! Randomness sources for the engine.
//!
//! Production ticks draw one seed from OS entropy and hand every character
//! its own ChaCha stream, so a batch is reproducible from the seed and the
//! character ids while workers never share a generator.

use crate::error::{EngineError, Result};
use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

/// Draw a 64-bit seed from the operating system.
///
/// Failure is surfaced, never replaced by a weaker source.
pub fn entropy_seed() -> Result<u64> {
    let mut bytes = [0u8; 8];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| EngineError::Entropy(e.to_string()))?;
    Ok(u64::from_le_bytes(bytes))
}

/// Generator for one character within one batch tick.
pub fn character_rng(tick_seed: u64, character_id: &Uuid) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(tick_seed);
    rng.set_stream(stream_for(character_id));
    rng
}

fn stream_for(character_id: &Uuid) -> u64 {
    let (hi, lo) = character_id.as_u64_pair();
    hi ^ lo.rotate_left(17)
}

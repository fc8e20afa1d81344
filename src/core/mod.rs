//! Shared constants, balance arithmetic and randomness sources.

pub mod balance;
pub mod constants;
pub mod rng;

pub use constants::*;

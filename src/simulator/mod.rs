//! Balance simulator for Monte Carlo analysis.
//!
//! Simulates thousands of characters to check:
//! - Affinity class shares against their declared weights
//! - Luck band and special event frequencies
//! - Realm pacing and breakthrough success against computed rates
//!
//! The simulator drives the same simulator and breakthrough rules as the
//! engine, so results match what the scheduler would produce.

mod config;
mod report;
mod runner;

pub use config::SimConfig;
pub use report::{AffinityShare, BandShare, CharacterRun, EventRate, SimReport};
pub use runner::run_simulation;

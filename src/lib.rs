//! Ascend - probabilistic progression engine for idle cultivation games
//!
//! Characters draw a spiritual affinity once, roll a daily luck value, and
//! train passively on a fixed tick. Each session's gains flow through the
//! luck bands, and realm breakthroughs are gated by an additive success rate.
//!
//! - [`catalog`]: weighted random selection and the affinity class catalog
//! - [`luck`]: luck bands, daily rolls and luck consumables
//! - [`progression`]: per-session gains and special events
//! - [`advancement`]: breakthrough attempts
//! - [`scheduler`]: the batch tick over every due character
//! - [`simulator`]: Monte Carlo balance checks on the same rules

pub mod advancement;
pub mod audit;
pub mod catalog;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod luck;
pub mod outcomes;
pub mod progression;
pub mod scheduler;
pub mod simulator;
pub mod store;
pub mod testing;

pub use config::EngineConfig;
pub use engine::ProgressionEngine;
pub use error::{EngineError, Result};
pub use scheduler::TickScheduler;

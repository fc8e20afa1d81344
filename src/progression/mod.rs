//! Character progression state and the per-session training simulator.

pub mod attributes;
pub mod simulator;
pub mod types;

pub use attributes::{AttributeKind, AttributeTotals};
pub use simulator::ProgressionSimulator;
pub use types::*;

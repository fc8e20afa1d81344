//! Recurring batch ticks: collect due characters, simulate them in
//! parallel, commit sequentially.

pub mod logic;
pub mod types;

pub use logic::{next_boundary, TickScheduler};
pub use types::*;

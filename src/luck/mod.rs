//! Luck banding, daily refresh and luck consumables.

pub mod logic;
pub mod types;

pub use logic::*;
pub use types::*;

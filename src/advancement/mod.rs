//! Realm breakthroughs: bonus assembly, the success roll and its effects.

pub mod logic;
pub mod types;

pub use logic::*;
pub use types::*;

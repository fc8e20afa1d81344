//! Weighted catalogs and the affinity class catalog built on them.

pub mod affinity;
pub mod weighted;

pub use affinity::*;
pub use weighted::WeightedCatalog;

//! Persistence boundary for character progression state.

pub mod memory;
pub mod snapshot;

pub use memory::MemoryStore;
pub use snapshot::SnapshotFile;

use crate::progression::CharacterProgressionState;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Character {0} not found")]
    NotFound(Uuid),

    /// Another writer saved the character first.
    #[error("Version conflict for {id}: expected {expected}, found {found}")]
    Conflict { id: Uuid, expected: u64, found: u64 },

    #[error("Character {0} already exists")]
    AlreadyExists(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt snapshot: {0}")]
    Corrupt(String),

    #[error("Encoding error: {0}")]
    Encode(#[from] bincode::Error),
}

/// Storage for character states, single writer per character.
///
/// `save` is a compare-and-swap on `version`: it succeeds only if the stored
/// version equals the version carried by `state`, and returns the new one.
pub trait CharacterStore: Send + Sync {
    fn load(&self, id: Uuid) -> Result<CharacterProgressionState, StoreError>;

    fn insert(&self, state: CharacterProgressionState) -> Result<(), StoreError>;

    fn save(&self, state: &CharacterProgressionState) -> Result<u64, StoreError>;

    /// Ids whose last tick is at or before `cutoff`, in a stable order.
    fn due_for_tick(&self, cutoff: i64) -> Result<Vec<Uuid>, StoreError>;

    fn remove(&self, id: Uuid) -> Result<(), StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

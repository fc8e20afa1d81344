use super::{CharacterStore, StoreError};
use crate::progression::CharacterProgressionState;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// In-process store with optimistic versioning.
#[derive(Debug, Default)]
pub struct MemoryStore {
    characters: RwLock<HashMap<Uuid, CharacterProgressionState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_states(states: Vec<CharacterProgressionState>) -> Result<Self, StoreError> {
        let store = Self::new();
        for state in states {
            store.insert(state)?;
        }
        Ok(store)
    }

    /// Every stored state, ordered by id.
    pub fn snapshot(&self) -> Vec<CharacterProgressionState> {
        let mut states: Vec<_> = self.read().values().cloned().collect();
        states.sort_by_key(|state| state.character_id);
        states
    }

    // Entries are replaced whole, so a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Uuid, CharacterProgressionState>> {
        self.characters.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Uuid, CharacterProgressionState>> {
        self.characters.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl CharacterStore for MemoryStore {
    fn load(&self, id: Uuid) -> Result<CharacterProgressionState, StoreError> {
        self.read().get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    fn insert(&self, state: CharacterProgressionState) -> Result<(), StoreError> {
        let mut characters = self.write();
        if characters.contains_key(&state.character_id) {
            return Err(StoreError::AlreadyExists(state.character_id));
        }
        characters.insert(state.character_id, state);
        Ok(())
    }

    fn save(&self, state: &CharacterProgressionState) -> Result<u64, StoreError> {
        let mut characters = self.write();
        let stored = characters
            .get_mut(&state.character_id)
            .ok_or(StoreError::NotFound(state.character_id))?;
        if stored.version != state.version {
            return Err(StoreError::Conflict {
                id: state.character_id,
                expected: state.version,
                found: stored.version,
            });
        }
        *stored = state.clone();
        stored.version = state.version + 1;
        Ok(stored.version)
    }

    fn due_for_tick(&self, cutoff: i64) -> Result<Vec<Uuid>, StoreError> {
        let mut due: Vec<Uuid> = self
            .read()
            .values()
            .filter(|state| state.last_tick_timestamp <= cutoff)
            .map(|state| state.character_id)
            .collect();
        due.sort();
        Ok(due)
    }

    fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        self.write()
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}

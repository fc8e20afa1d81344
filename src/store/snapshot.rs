//! Checksummed binary snapshots of a whole store.
//!
//! File format:
//! - Version magic (8 bytes)
//! - Data length (4 bytes)
//! - bincode-encoded states (variable length)
//! - SHA-256 over the three fields above (32 bytes)

use super::{MemoryStore, StoreError};
use crate::core::constants::{SNAPSHOT_FILE_NAME, SNAPSHOT_VERSION_MAGIC};
use crate::progression::CharacterProgressionState;
use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    /// Snapshot in the platform data directory, created if missing.
    pub fn new() -> Result<Self, StoreError> {
        let project_dirs = ProjectDirs::from("", "", "ascend").ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Could not determine data directory")
        })?;
        let data_dir = project_dirs.data_dir();
        fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(SNAPSHOT_FILE_NAME),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn write(&self, store: &MemoryStore) -> Result<(), StoreError> {
        let states = store.snapshot();
        let data = bincode::serialize(&states)?;
        let data_len = u32::try_from(data.len())
            .map_err(|_| StoreError::Corrupt(format!("snapshot of {} bytes is too large", data.len())))?;

        let mut hasher = Sha256::new();
        hasher.update(SNAPSHOT_VERSION_MAGIC.to_le_bytes());
        hasher.update(data_len.to_le_bytes());
        hasher.update(&data);
        let checksum = hasher.finalize();

        let mut file = fs::File::create(&self.path)?;
        file.write_all(&SNAPSHOT_VERSION_MAGIC.to_le_bytes())?;
        file.write_all(&data_len.to_le_bytes())?;
        file.write_all(&data)?;
        file.write_all(&checksum)?;

        info!(path = %self.path.display(), characters = states.len(), "wrote snapshot");
        Ok(())
    }

    /// Read and verify a snapshot.
    ///
    /// Fails on a wrong magic, a checksum mismatch or undecodable data.
    pub fn read(&self) -> Result<MemoryStore, StoreError> {
        let mut file = fs::File::open(&self.path)?;

        let mut version_bytes = [0u8; 8];
        file.read_exact(&mut version_bytes)?;
        let version = u64::from_le_bytes(version_bytes);
        if version != SNAPSHOT_VERSION_MAGIC {
            return Err(StoreError::Corrupt(format!(
                "invalid snapshot version: expected 0x{:016X}, got 0x{:016X}",
                SNAPSHOT_VERSION_MAGIC, version
            )));
        }

        let mut length_bytes = [0u8; 4];
        file.read_exact(&mut length_bytes)?;
        let data_len = u32::from_le_bytes(length_bytes);

        let mut data = vec![0u8; data_len as usize];
        file.read_exact(&mut data)?;

        let mut stored_checksum = [0u8; 32];
        file.read_exact(&mut stored_checksum)?;

        let mut hasher = Sha256::new();
        hasher.update(version_bytes);
        hasher.update(length_bytes);
        hasher.update(&data);
        if stored_checksum != hasher.finalize().as_slice() {
            return Err(StoreError::Corrupt(
                "checksum verification failed".to_string(),
            ));
        }

        let states: Vec<CharacterProgressionState> = bincode::deserialize(&data)?;
        MemoryStore::from_states(states)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progression::AttributeKind;
    use crate::store::CharacterStore;
    use std::sync::atomic::{AtomicU64, Ordering};
    use uuid::Uuid;

    fn temp_snapshot() -> SnapshotFile {
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);
        let test_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "ascend-snapshot-test-{}-{}",
            std::process::id(),
            test_id
        ));
        fs::create_dir_all(&dir).unwrap();
        SnapshotFile::at(dir.join(SNAPSHOT_FILE_NAME))
    }

    #[test]
    fn test_write_then_read_preserves_states() {
        let store = MemoryStore::new();
        let mut state = CharacterProgressionState::new(Uuid::new_v4(), "heavenly", 1_000);
        state.experience = 4_200;
        state.cultivation_realm = 7;
        state.attribute_totals.add(AttributeKind::MagicAttack, 33);
        state.last_luck_refresh = Some(86_400);
        store.insert(state.clone()).unwrap();

        let snapshot = temp_snapshot();
        snapshot.write(&store).unwrap();
        let restored = snapshot.read().unwrap();
        assert_eq!(restored.load(state.character_id).unwrap(), state);

        fs::remove_file(snapshot.path()).ok();
    }

    #[test]
    fn test_tampered_snapshot_rejected() {
        let store = MemoryStore::new();
        store
            .insert(CharacterProgressionState::new(Uuid::new_v4(), "dual", 0))
            .unwrap();
        let snapshot = temp_snapshot();
        snapshot.write(&store).unwrap();

        let mut bytes = fs::read(snapshot.path()).unwrap();
        let middle = bytes.len() / 2;
        bytes[middle] ^= 0xFF;
        fs::write(snapshot.path(), &bytes).unwrap();

        assert!(matches!(snapshot.read(), Err(StoreError::Corrupt(_))));
        fs::remove_file(snapshot.path()).ok();
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let snapshot = temp_snapshot();
        fs::write(snapshot.path(), [0u8; 64]).unwrap();
        assert!(matches!(snapshot.read(), Err(StoreError::Corrupt(_))));
        fs::remove_file(snapshot.path()).ok();
    }
}

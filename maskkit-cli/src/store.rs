//! File-backed state store.
//!
//! The real extension host encrypts the blob at rest; this developer store
//! only guarantees the other half of the contract, atomic replacement, by
//! writing to a temporary file and renaming over the target.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use maskkit_core::platform::{StateStore, StoreError, StoreResult};

/// Stores the state blob in a single file.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Creates a store over `path`; parent directories appear on first save.
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io("reading state file", err)),
        }
    }

    fn save(&self, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| StoreError::io("creating state directory", err))?;
        }
        let staged = self.path.with_extension("tmp");
        fs::write(&staged, bytes).map_err(|err| StoreError::io("writing state file", err))?;
        fs::rename(&staged, &self.path)
            .map_err(|err| StoreError::io("replacing state file", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("state.cbor"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStateStore::new(dir.path().join("nested/state.cbor"));

        store.save(b"first").unwrap();
        assert_eq!(store.load().unwrap().unwrap(), b"first");

        store.save(b"second").unwrap();
        assert_eq!(store.load().unwrap().unwrap(), b"second");

        // No staging file is left behind.
        assert!(!dir.path().join("nested/state.tmp").exists());
    }
}

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the saved conversation under the advisor home directory.
const HISTORY_KEY: &str = "agri-chat-history.json";

/// Key-scoped byte-string store for the conversation snapshot.
///
/// One fixed key, serialize-and-overwrite semantics. There is no partial
/// write protocol; a snapshot that fails to deserialize is treated as absent
/// by the caller.
pub trait SnapshotStore {
    fn get(&self) -> Result<Option<String>>;
    fn set(&mut self, raw: &str) -> Result<()>;
    fn remove(&mut self) -> Result<()>;
}

/// Snapshot store backed by a single JSON file.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(home: &Path) -> Self {
        Self {
            path: home.join(HISTORY_KEY),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn get(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)
            .context("Failed to read saved conversation")?;
        Ok(Some(raw))
    }

    fn set(&mut self, raw: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create advisor home directory")?;
        }
        fs::write(&self.path, raw).context("Failed to write saved conversation")
    }

    fn remove(&mut self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .context("Failed to delete saved conversation")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSnapshotStore::new(dir.path());

        assert!(store.get().unwrap().is_none());

        store.set(r#"[{"id":"1"}]"#).unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some(r#"[{"id":"1"}]"#));

        store.set("[]").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("[]"));

        store.remove().unwrap();
        assert!(store.get().unwrap().is_none());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileSnapshotStore::new(dir.path());
        store.remove().unwrap();
        store.remove().unwrap();
    }

    #[test]
    fn creates_missing_home_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("home");
        let mut store = FileSnapshotStore::new(&nested);
        store.set("[]").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("[]"));
    }
}

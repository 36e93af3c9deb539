//! File Storage
//!
//! A [`Storage`] backend that keeps every slot in one JSON object file.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::Storage;
use crate::error::{StateError, StateResult};

/// Storage backed by a single JSON object file.
///
/// All slots are loaded when the file is opened and the whole file is
/// rewritten on every [`set`](Storage::set). The rewrite goes through a
/// sibling temp file and a rename, so a crash mid-write leaves the previous
/// contents intact.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    slots: Mutex<IndexMap<String, String>>,
}

impl FileStorage {
    /// Open `path`, creating an empty storage if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> StateResult<Self> {
        let path = path.as_ref().to_path_buf();
        let slots = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                IndexMap::new()
            } else {
                serde_json::from_str(&text).map_err(|source| StateError::Decode {
                    key: path.display().to_string(),
                    source,
                })?
            }
        } else {
            IndexMap::new()
        };
        tracing::debug!(path = %path.display(), slots = slots.len(), "opened file storage");
        Ok(Self {
            path,
            slots: Mutex::new(slots),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, slots: &IndexMap<String, String>) -> StateResult<()> {
        let text = serde_json::to_string_pretty(slots).map_err(|source| StateError::Encode {
            key: self.path.display().to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> StateResult<()> {
        let mut slots = self.slots.lock();
        let mut next = slots.clone();
        next.insert(key.to_owned(), value);
        // Memory only moves once the file has.
        self.flush(&next)?;
        *slots = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("state.json")).unwrap();
        assert!(storage.get("state").is_none());
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("state:count", "3".into()).unwrap();
        storage.set("state:name", "akita".into()).unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("state:count").as_deref(), Some("3"));
        assert_eq!(reopened.get("state:name").as_deref(), Some("akita"));
    }

    #[test]
    fn failed_write_keeps_previous_value() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();

        let storage = FileStorage::open(sub.join("state.json")).unwrap();
        storage.set("state", "1".into()).unwrap();
        fs::remove_dir_all(&sub).unwrap();

        assert!(storage.set("state", "2".into()).is_err());
        assert!(storage.set("other", "x".into()).is_err());
        assert_eq!(storage.get("state").as_deref(), Some("1"));
        assert!(storage.get("other").is_none());
    }

    #[test]
    fn corrupt_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        let err = FileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StateError::Decode { .. }));
    }
}

//! Memory Storage
//!
//! A [`Storage`] backend that lives and dies with the process.

use dashmap::DashMap;

use super::Storage;
use crate::error::StateResult;

/// In-memory storage.
///
/// Intended for tests and embedding. Slots live in a `DashMap`, so a single
/// instance can be shared freely between stores and threads.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: DashMap<String, String>,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Remove every slot.
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Sorted list of occupied keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.slots.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).map(|v| v.value().clone())
    }

    fn set(&self, key: &str, value: String) -> StateResult<()> {
        self.slots.insert(key.to_owned(), value);
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryStorage
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            slots: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_slot_reads_none() {
        let storage = MemoryStorage::new();
        assert!(storage.get("state").is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn set_overwrites() {
        let storage = MemoryStorage::new();
        storage.set("state", "1".into()).unwrap();
        storage.set("state", "2".into()).unwrap();

        assert_eq!(storage.get("state").as_deref(), Some("2"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn collects_from_pairs() {
        let storage: MemoryStorage = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(storage.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(storage.get("a").as_deref(), Some("1"));
    }
}

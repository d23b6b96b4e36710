//! MemoryStorage - a volatile registry storage backend.
//!
//! Entries live for as long as the process does. Useful for tests,
//! ephemeral relays, and as the `"memory"` backend of the storage factory.

use anyhow::Result;
use dashmap::DashMap;
use lume_core::{RegistryStorage, SignedRegistryEntry, StorageOptions};

/// Name this backend is registered under.
pub const BACKEND_NAME: &str = "memory";

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: DashMap<String, SignedRegistryEntry>,
}

impl MemoryStorage {
    /// Creates a new, empty `MemoryStorage`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory constructor. Memory storage takes no options.
    pub fn create(_options: &StorageOptions) -> Result<Self> {
        Ok(Self::new())
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait::async_trait]
impl RegistryStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<SignedRegistryEntry>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, entry: SignedRegistryEntry) -> Result<bool> {
        self.entries.insert(key.to_owned(), entry);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lume_core::testutil::StorageTests;

    #[tokio::test]
    async fn test_memory_storage_contract() {
        let storage = MemoryStorage::new();
        StorageTests::new(&storage).run_all().await;
        StorageTests::with_seed(&storage, 1).run_all().await;
    }

    #[tokio::test]
    async fn test_len_tracks_distinct_keys() -> Result<()> {
        let storage = MemoryStorage::create(&StorageOptions::default())?;
        assert!(storage.is_empty());

        let entry = SignedRegistryEntry::new(vec![9u8; 32], 1, vec![1u8], None);
        storage.set(&entry.storage_key(), entry.clone()).await?;
        storage.set(&entry.storage_key(), entry).await?;
        assert_eq!(storage.len(), 1);
        Ok(())
    }
}

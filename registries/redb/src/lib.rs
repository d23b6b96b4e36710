//! RedbStorage - a persistent registry storage backend backed by redb.

use std::{path::Path, sync::Arc};

use anyhow::{Context, anyhow};
use lume_core::{RegistryStorage, SignedRegistryEntry, StorageOptions};
use redb::{Database, ReadableDatabase, TableDefinition, backends::InMemoryBackend};

/// Name this backend is registered under.
pub const BACKEND_NAME: &str = "redb";

/// File name of the database inside the configured directory.
pub const DB_FILE_NAME: &str = "registry.redb";

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("registry");

/// `RegistryStorage` implementation backed by a redb database.
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Opens (or creates) the database in directory `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)
            .with_context(|| format!("failed to create registry directory {}", path.display()))?;
        let db = Database::create(path.join(DB_FILE_NAME))?;
        Self::init(db)
    }

    /// Opens a database that lives only in memory.
    pub fn in_memory() -> anyhow::Result<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::init(db)
    }

    /// Factory constructor.
    ///
    /// Uses `options.path` as the database directory, or an in-memory
    /// database when `options.memory_only` is set.
    pub fn create(options: &StorageOptions) -> anyhow::Result<Self> {
        if options.memory_only {
            return Self::in_memory();
        }
        let path = options
            .path
            .as_ref()
            .ok_or_else(|| anyhow!("redb storage requires a path"))?;
        Self::open(path)
    }

    fn init(db: Database) -> anyhow::Result<Self> {
        // Create the table up front so that a first read on a fresh
        // database does not fail with a missing table.
        {
            let write_txn = db.begin_write()?;
            {
                let _ = write_txn.open_table(TABLE)?;
            }
            write_txn.commit()?;
        }

        Ok(Self { db: Arc::new(db) })
    }
}

impl std::fmt::Debug for RedbStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStorage").finish()
    }
}

#[async_trait::async_trait]
impl RegistryStorage for RedbStorage {
    async fn get(&self, key: &str) -> anyhow::Result<Option<SignedRegistryEntry>> {
        let db = self.db.clone();
        let key = key.to_owned();

        tokio::task::spawn_blocking(move || -> anyhow::Result<Option<SignedRegistryEntry>> {
            let read_txn = db.begin_read()?;
            let table = read_txn.open_table(TABLE)?;

            let maybe_entry = table
                .get(key.as_str())?
                .map(|guard| SignedRegistryEntry::from_record(guard.value()))
                .transpose()
                .with_context(|| format!("corrupt registry record for {key}"))?;

            Ok(maybe_entry)
        })
        .await
        .map_err(|e| anyhow!("redb read task failed: {}", e))?
    }

    async fn set(&self, key: &str, entry: SignedRegistryEntry) -> anyhow::Result<bool> {
        let db = self.db.clone();
        let key = key.to_owned();
        let record = entry.to_record()?;

        tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let write_txn = db.begin_write()?;
            {
                let mut table = write_txn.open_table(TABLE)?;
                table.insert(key.as_str(), record.as_slice())?;
            }
            write_txn.commit()?;
            Ok(true)
        })
        .await
        .map_err(|e| anyhow!("redb write task failed: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lume_core::testutil::StorageTests;

    #[tokio::test]
    async fn test_in_memory_contract() -> anyhow::Result<()> {
        let storage = RedbStorage::in_memory()?;
        StorageTests::new(&storage).run_all().await;
        Ok(())
    }

    #[test]
    fn test_create_requires_path() {
        let err = RedbStorage::create(&StorageOptions::default()).unwrap_err();
        assert!(err.to_string().contains("requires a path"));
    }

    #[test]
    fn test_create_memory_only_ignores_path() {
        let options = StorageOptions {
            path: None,
            memory_only: true,
        };
        assert!(RedbStorage::create(&options).is_ok());
    }
}

use lume_core::{RegistryStorage, SignedRegistryEntry, StorageOptions, testutil::StorageTests};
use lume_registry_redb::{DB_FILE_NAME, RedbStorage};
use tempfile::tempdir;

#[tokio::test]
async fn file_backed_contract() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let storage = RedbStorage::open(dir.path())?;
    StorageTests::new(&storage).run_all().await;
    Ok(())
}

/// Entries written by one handle are visible after the database is
/// closed and reopened from the same directory.
#[tokio::test]
async fn entries_survive_reopen() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let registry_dir = dir.path().join("data").join("registry");
    let entry = SignedRegistryEntry::new(vec![3u8; 32], 17, vec![1u8, 2, 3], None);

    {
        let storage = RedbStorage::create(&StorageOptions {
            path: Some(registry_dir.clone()),
            memory_only: false,
        })?;
        assert!(storage.set(&entry.storage_key(), entry.clone()).await?);
    }

    assert!(registry_dir.join(DB_FILE_NAME).exists());

    let reopened = RedbStorage::open(&registry_dir)?;
    assert_eq!(reopened.get(&entry.storage_key()).await?, Some(entry));
    assert_eq!(reopened.get("00").await?, None);
    Ok(())
}

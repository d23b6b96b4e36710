//! Test utilities for `RegistryStorage` implementations.
//!
//! Every backend has to present the same contract to the registry service.
//! This suite checks that contract and can be run against any backend.
//!
//! # Usage
//!
//! In your backend crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! lume_core = { workspace = true, features = ["testutil"] }
//! ```
//!
//! In your test file:
//!
//! ```ignore
//! use lume_core::testutil::StorageTests;
//!
//! #[tokio::test]
//! async fn test_my_storage() {
//!     let storage = MyStorage::new(...);
//!     StorageTests::new(&storage).run_all().await;
//! }
//! ```

use bytes::Bytes;

use crate::entry::{KEY_SIZE, SIGNATURE_SIZE, SignedRegistryEntry};
use crate::storage::RegistryStorage;

/// Test suite for `RegistryStorage` implementations.
pub struct StorageTests<'a, S> {
    storage: &'a S,
    /// Distinguishes the keys of this run from data already in the backend.
    seed: u8,
}

impl<'a, S: RegistryStorage> StorageTests<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage, seed: 0 }
    }

    /// Use a different key space, for running the suite twice against the
    /// same backend instance.
    pub fn with_seed(storage: &'a S, seed: u8) -> Self {
        Self { storage, seed }
    }

    fn entry(&self, slot: u8, revision: u64, data: &'static [u8]) -> SignedRegistryEntry {
        let mut key = vec![slot; KEY_SIZE];
        key[0] = self.seed;
        SignedRegistryEntry::new(
            key,
            revision,
            Bytes::from_static(data),
            Some(Bytes::from(vec![slot ^ 0x5A; SIGNATURE_SIZE])),
        )
    }

    /// Run all tests.
    pub async fn run_all(&self) {
        self.test_get_missing().await;
        self.test_set_then_get().await;
        self.test_set_overwrites().await;
        self.test_keys_are_independent().await;
        self.test_unsigned_entry_preserved().await;
    }

    pub async fn test_get_missing(&self) {
        let missing = self.entry(0xF0, 0, b"");
        let got = self
            .storage
            .get(&missing.storage_key())
            .await
            .expect("get on a missing key should not fail");
        assert_eq!(got, None, "missing key should return None");
    }

    pub async fn test_set_then_get(&self) {
        let entry = self.entry(0x01, 1, b"first");
        let key = entry.storage_key();
        assert!(
            self.storage
                .set(&key, entry.clone())
                .await
                .expect("set failed"),
            "set should report success"
        );
        let got = self.storage.get(&key).await.expect("get failed");
        assert_eq!(got, Some(entry), "stored entry should read back unchanged");
    }

    pub async fn test_set_overwrites(&self) {
        let old = self.entry(0x02, 5, b"old");
        let new = self.entry(0x02, 3, b"new");
        let key = old.storage_key();

        self.storage.set(&key, old).await.expect("set failed");
        self.storage
            .set(&key, new.clone())
            .await
            .expect("overwrite failed");

        // Storage does not resolve conflicts, even a lower revision replaces.
        let got = self.storage.get(&key).await.expect("get failed");
        assert_eq!(got, Some(new), "set should replace the previous entry");
    }

    pub async fn test_keys_are_independent(&self) {
        let a = self.entry(0x03, 1, b"a");
        let b = self.entry(0x04, 2, b"b");

        self.storage
            .set(&a.storage_key(), a.clone())
            .await
            .expect("set a failed");
        self.storage
            .set(&b.storage_key(), b.clone())
            .await
            .expect("set b failed");

        assert_eq!(self.storage.get(&a.storage_key()).await.unwrap(), Some(a));
        assert_eq!(self.storage.get(&b.storage_key()).await.unwrap(), Some(b));
    }

    pub async fn test_unsigned_entry_preserved(&self) {
        let mut entry = self.entry(0x05, u64::MAX, &[0xFF; 48]);
        entry.signature = None;
        let key = entry.storage_key();

        self.storage
            .set(&key, entry.clone())
            .await
            .expect("set failed");
        assert_eq!(self.storage.get(&key).await.unwrap(), Some(entry));
    }
}

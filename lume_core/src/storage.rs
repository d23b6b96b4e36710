//! The storage contract for registry entries and the backend factory.
//!
//! Backends store entries under the hex encoding of the entry's public key
//! (see [`crate::storage_key`]). The registry service never branches on
//! which backend it talks to; everything it needs goes through
//! [`RegistryStorage`].

use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entry::SignedRegistryEntry;

/// Key-value storage of registry entries.
///
/// Implementations store what they are given: conflict resolution is the
/// caller's job. `set` returns `Ok(false)` when the backend declined the
/// write without failing outright.
#[async_trait]
pub trait RegistryStorage: fmt::Debug + Send + Sync {
    /// Retrieves the entry stored under `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(entry))` if an entry is found.
    /// * `Ok(None)` if no entry exists for the key.
    /// * `Err(anyhow::Error)` if the backend failed.
    async fn get(&self, key: &str) -> Result<Option<SignedRegistryEntry>>;

    /// Stores `entry` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, entry: SignedRegistryEntry) -> Result<bool>;
}

#[async_trait]
impl<T: RegistryStorage + ?Sized> RegistryStorage for Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<SignedRegistryEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, entry: SignedRegistryEntry) -> Result<bool> {
        (**self).set(key, entry).await
    }
}

#[async_trait]
impl<T: RegistryStorage + ?Sized> RegistryStorage for Box<T> {
    async fn get(&self, key: &str) -> Result<Option<SignedRegistryEntry>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, entry: SignedRegistryEntry) -> Result<bool> {
        (**self).set(key, entry).await
    }
}

/// Backend-specific options passed to a storage constructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageOptions {
    /// Directory for persistent backends.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Keep all data in memory even if the backend could persist it.
    #[serde(default)]
    pub memory_only: bool,
}

/// Constructor registered for a backend name.
pub type StorageConstructor =
    Arc<dyn Fn(&StorageOptions) -> Result<Arc<dyn RegistryStorage>> + Send + Sync>;

/// Errors returned by [`StorageFactory::create`].
#[derive(thiserror::Error, Debug)]
pub enum FactoryError {
    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),

    #[error("failed to open storage backend {name}: {source}")]
    Backend {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Name-keyed registry of storage backends.
///
/// Backends register a constructor under a name before first use; the host
/// then instantiates whichever one its configuration names.
#[derive(Clone, Default)]
pub struct StorageFactory {
    backends: BTreeMap<String, StorageConstructor>,
}

impl fmt::Debug for StorageFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageFactory")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StorageFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `constructor` under `name`, replacing any previous
    /// registration with the same name.
    pub fn register<S, F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        S: RegistryStorage + 'static,
        F: Fn(&StorageOptions) -> Result<S> + Send + Sync + 'static,
    {
        let constructor: StorageConstructor = Arc::new(move |options: &StorageOptions| {
            let storage: Arc<dyn RegistryStorage> = Arc::new(constructor(options)?);
            Ok(storage)
        });
        self.backends.insert(name.into(), constructor);
        self
    }

    /// Returns true if a backend is registered under `name`.
    pub fn has(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Names of all registered backends, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }

    /// Instantiates the backend registered under `name`.
    pub fn create(
        &self,
        name: &str,
        options: &StorageOptions,
    ) -> Result<Arc<dyn RegistryStorage>, FactoryError> {
        let constructor = self
            .backends
            .get(name)
            .ok_or_else(|| FactoryError::UnknownBackend(name.to_owned()))?;

        debug!(backend = name, "creating registry storage");
        constructor(options).map_err(|source| FactoryError::Backend {
            name: name.to_owned(),
            source,
        })
    }
}

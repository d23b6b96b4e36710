use std::{path::Path, sync::Arc};

use lume_core::{FactoryError, RegistryStorage, StorageFactory};
use lume_registry::{Inbound, RegistryService, Transport};
use lume_registry_memory::MemoryStorage;
use lume_registry_redb::RedbStorage;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::info;

use crate::config::LumeNodeConfig;

pub mod config;
pub mod identity;

/// Name older deployments used for the persistent backend.
pub const LMDB_ALIAS: &str = "lmdb";

/// Capacity of the inbound channel between the transport and the service.
pub const INBOUND_CAPACITY: usize = 1024;

/// Factory with every backend this node ships with.
pub fn default_factory() -> StorageFactory {
    let mut factory = StorageFactory::new();
    factory
        .register(lume_registry_memory::BACKEND_NAME, MemoryStorage::create)
        .register(lume_registry_redb::BACKEND_NAME, RedbStorage::create)
        .register(LMDB_ALIAS, RedbStorage::create);
    factory
}

/// Instantiates the configured storage backend.
///
/// Fails if the backend name is unknown or the backend cannot open its
/// storage.
pub fn open_storage(
    factory: &StorageFactory,
    config: &LumeNodeConfig,
    config_dir: &Path,
) -> Result<Arc<dyn RegistryStorage>, FactoryError> {
    let options = config.store.options(config_dir);
    let storage = factory.create(&config.store.backend, &options)?;
    info!(
        backend = %config.store.backend,
        path = ?options.path,
        memory_only = options.memory_only,
        "opened registry storage"
    );
    Ok(storage)
}

/// Builds the registry service for `config` on top of `transport`.
pub fn build_service<T: Transport>(
    config: &LumeNodeConfig,
    config_dir: &Path,
    transport: Arc<T>,
) -> Result<RegistryService<T>, FactoryError> {
    let storage = open_storage(&default_factory(), config, config_dir)?;
    Ok(RegistryService::new(storage, transport, &config.registry))
}

/// Starts the service's run loop.
///
/// The transport pushes deliveries into the returned sender; dropping every
/// sender stops the loop once in-flight requests are done.
pub fn spawn_service<T: Transport>(
    service: Arc<RegistryService<T>>,
) -> (mpsc::Sender<Inbound>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
    let handle = tokio::spawn(service.run(rx));
    (tx, handle)
}

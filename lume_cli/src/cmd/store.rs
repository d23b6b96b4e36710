use std::{path::Path, sync::Arc};

use anyhow::{Result, bail};
use bytes::Bytes;
use lume_core::{RegistryStorage, storage_key};
use lume_node::{
    build_service,
    config::{LumeNodeConfig, config_dir},
    default_factory,
    identity::{load_secret_key, peer_id},
    open_storage,
};
use lume_registry::{Dispatched, PeerId};

use crate::helpers::{StdoutTransport, describe_entry, parse_hex};

pub async fn run_get(config: &LumeNodeConfig, config_file: &Path, public_key: &str) -> Result<()> {
    let public_key = parse_hex(public_key, "public key")?;
    let storage = open_storage(&default_factory(), config, config_dir(config_file))?;

    match storage.get(&storage_key(&public_key)).await? {
        Some(entry) => {
            println!("{}", describe_entry(&entry, config.registry.key_format));
            Ok(())
        }
        None => bail!("no entry for {}", hex::encode(&public_key)),
    }
}

pub async fn run_apply(
    config: &LumeNodeConfig,
    config_file: &Path,
    frame_hex: &str,
    from: Option<&str>,
) -> Result<()> {
    let dir = config_dir(config_file);
    let bytes = Bytes::from(parse_hex(frame_hex, "frame")?);
    let origin = match from {
        Some(from) => PeerId::from(parse_hex(from, "peer")?),
        None => config
            .identity
            .as_ref()
            .and_then(|identity| load_secret_key(identity, dir))
            .map(|key| peer_id(&key))
            .unwrap_or_else(|| PeerId::from([0u8; 32])),
    };

    let service = build_service(config, dir, Arc::new(StdoutTransport))?;
    match service.handle_inbound(bytes, &origin).await? {
        Dispatched::Create(outcome) => println!("create: {outcome:?}"),
        Dispatched::Query(Some(_)) => println!("query: found"),
        Dispatched::Query(None) => println!("query: not found"),
        Dispatched::Observed(message_type) => println!("observed: {message_type:?}"),
        Dispatched::Dropped => println!("dropped: not a registry frame"),
    }
    Ok(())
}

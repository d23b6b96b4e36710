use std::path::Path;

use anyhow::{Result, bail};
use lume_core::{Frame, Message, MessageType, SignedRegistryEntry};
use lume_node::identity::load_secret_key_file;
use tracing::info;

use crate::helpers::{parse_hex, write_new_secret_key};

pub fn run_keygen(out: &Path, force: bool) -> Result<()> {
    if out.exists() && !force {
        bail!("{} already exists, pass --force to overwrite", out.display());
    }
    let key = write_new_secret_key(out)?;
    info!("wrote secret key to {out:?}");
    println!("{}", hex::encode(key.verifying_key().to_bytes()));
    Ok(())
}

pub fn run_sign(key_file: &Path, revision: u64, data_hex: &str, prefix: Option<u8>) -> Result<()> {
    let key = load_secret_key_file(key_file)?;
    let data = parse_hex(data_hex, "data")?;
    let mut entry = SignedRegistryEntry::signed(&key, revision, data)?;
    if let Some(prefix) = prefix {
        // The signature only covers revision and data, so prefixing the key
        // afterwards leaves it valid.
        let mut public_key = Vec::with_capacity(entry.public_key.len() + 1);
        public_key.push(prefix);
        public_key.extend_from_slice(&entry.public_key);
        entry.public_key = public_key.into();
    }

    let frame = Frame::from(Message::from_entry(MessageType::Create, &entry)).encode()?;
    println!("{}", hex::encode(frame));
    Ok(())
}

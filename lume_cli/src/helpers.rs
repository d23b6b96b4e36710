use std::{fs, path::Path};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use ed25519_dalek::SigningKey;
use lume_core::{Frame, KeyFormat, SignedRegistryEntry, check};
use lume_registry::{PeerId, Transport};
use rand::RngCore;

/// Generates a random ed25519 secret key and writes its raw bytes to `path`.
pub fn write_new_secret_key(path: &Path) -> Result<SigningKey> {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(SigningKey::from_bytes(&bytes))
}

pub fn parse_hex(s: &str, what: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).with_context(|| format!("invalid hex for {what}"))
}

/// Human-readable dump of an entry, one field per line.
pub fn describe_entry(entry: &SignedRegistryEntry, format: KeyFormat) -> String {
    let validity = match check(entry, format) {
        Ok(()) => "valid".to_owned(),
        Err(err) => format!("invalid ({err})"),
    };
    let signature = entry
        .signature
        .as_ref()
        .map(hex::encode)
        .unwrap_or_else(|| "-".to_owned());
    format!(
        "public key: {}\nrevision:   {}\ndata:       {}\nsignature:  {}\nstatus:     {}",
        hex::encode(&entry.public_key),
        entry.revision,
        hex::encode(&entry.data),
        signature,
        validity,
    )
}

pub fn describe_frame(frame: &Frame, format: KeyFormat) -> String {
    match frame {
        Frame::Message(message) => format!(
            "frame:      {:?}\n{}",
            message.message_type,
            describe_entry(&message.to_entry(), format)
        ),
        Frame::Query(query) => format!(
            "frame:      Query\npublic key: {}",
            hex::encode(&query.public_key)
        ),
    }
}

/// Transport with no peers: every outgoing frame is "broadcast" by
/// printing it to stdout as hex.
#[derive(Debug, Default)]
pub struct StdoutTransport;

#[async_trait]
impl Transport for StdoutTransport {
    type Connection = ();

    fn connection(&self, _peer: &PeerId) -> Option<()> {
        None
    }

    async fn send(&self, _connection: &(), bytes: Bytes) -> Result<()> {
        println!("send {}", hex::encode(&bytes));
        Ok(())
    }

    async fn broadcast(&self, bytes: Bytes) -> Result<()> {
        println!("broadcast {}", hex::encode(&bytes));
        Ok(())
    }
}

//! The signed registry entry.
//!
//! A registry slot is identified by the public key of its owner. Each slot
//! holds exactly one entry at a time: the one with the highest revision that
//! was ever accepted for it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Maximum length of the `data` field of an entry.
pub const MAX_DATA_SIZE: usize = 48;

/// Size of an Ed25519 public key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of an Ed25519 signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// A registry entry as published by the owner of `public_key`.
///
/// Entries are created and signed off-node; this type carries them through
/// validation, storage and the wire unchanged. Nothing here enforces the
/// field constraints; see [`crate::crypto::check`] for that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignedRegistryEntry {
    /// Owner of the registry slot. 32 bytes, or 33 with a leading type
    /// prefix when running with [`crate::KeyFormat::Prefixed`].
    pub public_key: Bytes,

    /// Version counter; the highest accepted revision wins the slot.
    pub revision: u64,

    /// Payload, at most [`MAX_DATA_SIZE`] bytes.
    pub data: Bytes,

    /// Ed25519 signature over [`crate::signing_payload`].
    pub signature: Option<Bytes>,
}

impl SignedRegistryEntry {
    pub fn new(
        public_key: impl Into<Bytes>,
        revision: u64,
        data: impl Into<Bytes>,
        signature: Option<Bytes>,
    ) -> Self {
        Self {
            public_key: public_key.into(),
            revision,
            data: data.into(),
            signature,
        }
    }

    /// Key under which this entry is addressed in storage.
    pub fn storage_key(&self) -> String {
        storage_key(&self.public_key)
    }

    /// Serializes the entry for persistent storage.
    pub fn to_record(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes an entry previously written with [`Self::to_record`].
    pub fn from_record(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

/// Lowercase hex encoding of a public key, used as the storage key.
pub fn storage_key(public_key: &[u8]) -> String {
    hex::encode(public_key)
}

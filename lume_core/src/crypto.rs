//! Entry signing and validation.
//!
//! The signature of an entry covers the canonical signing payload:
//!
//! | Field | Size (bytes) | Description |
//! |---|---|---|
//! | Revision | 8 | Little-endian `u64` |
//! | Data length | 1 | `data.len()` |
//! | Data | Variable | The entry payload (max 48 bytes) |
//!
//! The public key is not part of the payload; it is bound by being the key
//! the signature has to verify against.

use bytes::{BufMut, Bytes, BytesMut};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::entry::{KEY_SIZE, MAX_DATA_SIZE, SIGNATURE_SIZE, SignedRegistryEntry};

/// How the `public_key` bytes of an entry map to an Ed25519 verifying key.
///
/// Storage keying and echoed frames always use the full key as received;
/// this only affects which bytes are handed to signature verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyFormat {
    /// The key is the bare 32-byte Ed25519 public key.
    #[default]
    Raw,
    /// The key is a one-byte type prefix followed by the 32-byte Ed25519
    /// public key. The prefix is stripped before verification.
    Prefixed,
}

impl KeyFormat {
    /// Length a public key must have under this format.
    pub fn key_len(self) -> usize {
        match self {
            KeyFormat::Raw => KEY_SIZE,
            KeyFormat::Prefixed => KEY_SIZE + 1,
        }
    }

    /// Returns the Ed25519 key bytes embedded in `public_key`, or `None` if
    /// the key has the wrong length for this format.
    pub fn verifying_key_bytes(self, public_key: &[u8]) -> Option<&[u8; KEY_SIZE]> {
        if public_key.len() != self.key_len() {
            return None;
        }
        let raw = match self {
            KeyFormat::Raw => public_key,
            KeyFormat::Prefixed => &public_key[1..],
        };
        raw.try_into().ok()
    }
}

/// Reasons an entry fails validation.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum EntryError {
    #[error("signature missing")]
    SignatureMissing,

    #[error("data too large: {size} bytes (max: {max})")]
    DataTooLarge { size: usize, max: usize },

    #[error("invalid public key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("public key is not a valid ed25519 point")]
    InvalidKey,

    #[error("invalid signature length: expected {expected}, got {actual}")]
    InvalidSignatureLength { expected: usize, actual: usize },

    #[error("signature verification failed")]
    InvalidSignature,
}

/// Builds the canonical signing payload for a revision and data pair.
///
/// The length is a single byte, so `data` must not exceed 255 bytes.
/// Validation rejects anything over [`MAX_DATA_SIZE`] before this is
/// computed.
pub fn signing_payload(revision: u64, data: &[u8]) -> Bytes {
    debug_assert!(data.len() <= u8::MAX as usize, "data length does not fit the length byte");
    let mut buf = BytesMut::with_capacity(8 + 1 + data.len());
    buf.put_u64_le(revision);
    buf.put_u8(data.len() as u8);
    buf.put_slice(data);
    buf.freeze()
}

/// Signs the revision and data of `entry` with `signing_key`.
///
/// Refuses data over [`MAX_DATA_SIZE`], which no registry would accept.
pub fn sign_entry(
    entry: &SignedRegistryEntry,
    signing_key: &SigningKey,
) -> Result<Signature, EntryError> {
    if entry.data.len() > MAX_DATA_SIZE {
        return Err(EntryError::DataTooLarge {
            size: entry.data.len(),
            max: MAX_DATA_SIZE,
        });
    }
    Ok(signing_key.sign(&signing_payload(entry.revision, &entry.data)))
}

impl SignedRegistryEntry {
    /// Creates an entry owned by `signing_key` and signs it.
    pub fn signed(
        signing_key: &SigningKey,
        revision: u64,
        data: impl Into<Bytes>,
    ) -> Result<Self, EntryError> {
        let mut entry = SignedRegistryEntry::new(
            signing_key.verifying_key().to_bytes().to_vec(),
            revision,
            data,
            None,
        );
        let signature = sign_entry(&entry, signing_key)?;
        entry.signature = Some(Bytes::copy_from_slice(&signature.to_bytes()));
        Ok(entry)
    }
}

/// Checks an entry, returning the first reason it is invalid.
///
/// The data size bound is enforced before any key parsing, payload
/// construction or signature verification takes place.
pub fn check(entry: &SignedRegistryEntry, format: KeyFormat) -> Result<(), EntryError> {
    let signature = match entry.signature.as_deref() {
        Some(sig) if !sig.is_empty() => sig,
        _ => return Err(EntryError::SignatureMissing),
    };

    if entry.data.len() > MAX_DATA_SIZE {
        return Err(EntryError::DataTooLarge {
            size: entry.data.len(),
            max: MAX_DATA_SIZE,
        });
    }

    let key_bytes =
        format
            .verifying_key_bytes(&entry.public_key)
            .ok_or(EntryError::InvalidKeyLength {
                expected: format.key_len(),
                actual: entry.public_key.len(),
            })?;
    let verifying_key = VerifyingKey::from_bytes(key_bytes).map_err(|_| EntryError::InvalidKey)?;

    let signature =
        Signature::from_slice(signature).map_err(|_| EntryError::InvalidSignatureLength {
            expected: SIGNATURE_SIZE,
            actual: signature.len(),
        })?;

    verifying_key
        .verify(&signing_payload(entry.revision, &entry.data), &signature)
        .map_err(|_| EntryError::InvalidSignature)
}

/// Returns true if `entry` carries a valid signature by its own raw key.
pub fn verify(entry: &SignedRegistryEntry) -> bool {
    verify_with(entry, KeyFormat::Raw)
}

/// Returns true if `entry` is valid under the given key format.
pub fn verify_with(entry: &SignedRegistryEntry, format: KeyFormat) -> bool {
    check(entry, format).is_ok()
}

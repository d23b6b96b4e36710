//! Core Lume registry protocol types and traits.
//!
//! This crate defines the shared types and traits used by all Lume registry
//! crates.
//!
//! ## Protocol types (wire-stable)
//!
//! - Registry entries and their canonical signing payload
//!   (`entry::SignedRegistryEntry`, `crypto::signing_payload`)
//! - Wire frames exchanged over the flood transport (`frame::Frame`,
//!   `frame::Message`, `frame::Query`)
//!
//! Changes to these are protocol changes: peers running different encodings
//! will silently drop each other's traffic.
//!
//! ## Convenience APIs (non-wire)
//!
//! - Entry validation (`crypto::verify`, `crypto::KeyFormat`)
//! - The storage contract (`RegistryStorage`) and the name-keyed backend
//!   factory (`StorageFactory`); implementations live in
//!   `lume_registry_memory` and `lume_registry_redb`

pub mod crypto;
pub mod entry;
pub mod frame;
pub mod storage;

// Test utilities (behind feature flag)
#[cfg(feature = "testutil")]
pub mod testutil;

// --- Core Public Surface ---

pub use crypto::{EntryError, KeyFormat, check, signing_payload, verify, verify_with};
pub use entry::{KEY_SIZE, MAX_DATA_SIZE, SIGNATURE_SIZE, SignedRegistryEntry, storage_key};
pub use frame::{Frame, FrameError, Message, MessageType, Query};
pub use storage::{
    FactoryError, RegistryStorage, StorageConstructor, StorageFactory, StorageOptions,
};

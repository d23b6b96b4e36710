//! Registry protocol service for Lume.
//!
//! Peers flood CREATE and QUERY frames over a shared bus. This crate turns
//! those frames into registry state and answers:
//!
//! - CREATE: validate the signed entry, keep whichever of the incoming and
//!   stored entries has the higher revision, and echo the winner back as
//!   CREATED.
//! - QUERY: look up the entry for a public key and return it as RESPONSE.
//! - CREATED / RESPONSE from others are published to local subscribers.
//!
//! Replies go straight to the requesting peer when a connection is open and
//! are broadcast otherwise.

pub mod config;
pub mod error;
pub mod locks;
pub mod router;
pub mod service;
pub mod transport;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use router::{ResponseRouter, Route};
pub use service::{CreateOutcome, Dispatched, ObservedFrame, RegistryService};
pub use transport::{Inbound, PeerId, Transport};

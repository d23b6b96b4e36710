//! The flood transport as seen by the registry service.
//!
//! Peer discovery, connection management and gossip propagation live
//! outside this crate. The service only needs to look up an open connection
//! by peer identity, send to it, and broadcast to everyone.

use std::{fmt, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Identity of a remote peer, as reported by the transport.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(Bytes);

impl PeerId {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// First 5 bytes in hex, for log lines.
    pub fn fmt_short(&self) -> String {
        hex::encode(&self.0[..self.0.len().min(5)])
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PeerId").field(&self.fmt_short()).finish()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl From<[u8; 32]> for PeerId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(Bytes::copy_from_slice(&bytes))
    }
}

impl From<Vec<u8>> for PeerId {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into())
    }
}

impl From<Bytes> for PeerId {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

/// A payload delivered by the transport, with the peer it came from.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub bytes: Bytes,
    pub origin: PeerId,
}

impl Inbound {
    pub fn new(bytes: impl Into<Bytes>, origin: PeerId) -> Self {
        Self {
            bytes: bytes.into(),
            origin,
        }
    }
}

/// Outbound half of the flood transport.
#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    /// Handle to an open connection.
    type Connection: Send + Sync;

    /// Returns the open connection to `peer`, if there is one.
    fn connection(&self, peer: &PeerId) -> Option<Self::Connection>;

    /// Sends `bytes` over a single connection.
    async fn send(&self, connection: &Self::Connection, bytes: Bytes) -> Result<()>;

    /// Floods `bytes` to all connected peers.
    async fn broadcast(&self, bytes: Bytes) -> Result<()>;
}

#[async_trait]
impl<T: Transport> Transport for Arc<T> {
    type Connection = T::Connection;

    fn connection(&self, peer: &PeerId) -> Option<Self::Connection> {
        (**self).connection(peer)
    }

    async fn send(&self, connection: &Self::Connection, bytes: Bytes) -> Result<()> {
        (**self).send(connection, bytes).await
    }

    async fn broadcast(&self, bytes: Bytes) -> Result<()> {
        (**self).broadcast(bytes).await
    }
}

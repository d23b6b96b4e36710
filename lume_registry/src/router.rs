//! Delivery of outgoing frames.

use std::sync::Arc;

use lume_core::Frame;
use tracing::trace;

use crate::{
    error::{RegistryError, Result},
    transport::{PeerId, Transport},
};

/// How a frame left this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Sent over the open connection to the target.
    Direct,
    /// No connection to the target was known; flooded to all peers.
    Broadcast,
}

/// Sends frames to a peer directly when connected, by broadcast otherwise.
///
/// Broadcasting relies on flood propagation to eventually reach the target
/// when the direct route is unknown or stale.
#[derive(Debug)]
pub struct ResponseRouter<T> {
    transport: Arc<T>,
}

impl<T> Clone for ResponseRouter<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: Transport> ResponseRouter<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub async fn send_direct_or_broadcast(&self, frame: &Frame, target: &PeerId) -> Result<Route> {
        let bytes = frame.encode()?;

        match self.transport.connection(target) {
            Some(connection) => {
                trace!(peer = %target.fmt_short(), tag = frame.tag(), "sending frame directly");
                self.transport
                    .send(&connection, bytes)
                    .await
                    .map_err(RegistryError::Transport)?;
                Ok(Route::Direct)
            }
            None => {
                trace!(peer = %target.fmt_short(), tag = frame.tag(), "no connection, broadcasting frame");
                self.transport
                    .broadcast(bytes)
                    .await
                    .map_err(RegistryError::Transport)?;
                Ok(Route::Broadcast)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{RecordingTransport, Sent};
    use lume_core::Query;

    fn peer(byte: u8) -> PeerId {
        PeerId::from([byte; 32])
    }

    #[tokio::test]
    async fn test_direct_when_connected() {
        let transport = Arc::new(RecordingTransport::new());
        transport.connect(peer(1));
        let router = ResponseRouter::new(transport.clone());

        let frame = Frame::from(Query::new(vec![9u8; 32]));
        let route = router
            .send_direct_or_broadcast(&frame, &peer(1))
            .await
            .unwrap();

        assert_eq!(route, Route::Direct);
        assert_eq!(
            transport.take(),
            vec![Sent::Direct {
                peer: peer(1),
                bytes: frame.encode().unwrap()
            }]
        );
    }

    #[tokio::test]
    async fn test_broadcast_when_not_connected() {
        let transport = Arc::new(RecordingTransport::new());
        transport.connect(peer(1));
        let router = ResponseRouter::new(transport.clone());

        let frame = Frame::from(Query::new(vec![9u8; 32]));
        let route = router
            .send_direct_or_broadcast(&frame, &peer(2))
            .await
            .unwrap();

        assert_eq!(route, Route::Broadcast);
        assert_eq!(
            transport.take(),
            vec![Sent::Broadcast {
                bytes: frame.encode().unwrap()
            }]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let transport = Arc::new(RecordingTransport::new());
        transport.set_failing(true);
        let router = ResponseRouter::new(transport.clone());

        let frame = Frame::from(Query::new(vec![9u8; 32]));
        let err = router
            .send_direct_or_broadcast(&frame, &peer(3))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Transport(_)));
        assert!(transport.take().is_empty());
    }
}

//! The registry service: dispatch of inbound frames, conflict resolution
//! for creates, and query answering.

use std::{fmt, sync::Arc};

use bytes::Bytes;
use lume_core::{
    Frame, KeyFormat, Message, MessageType, RegistryStorage, SignedRegistryEntry, storage_key,
    verify_with,
};
use tokio::{
    sync::{broadcast, mpsc},
    task::{JoinError, JoinSet},
};
use tracing::{debug, info, trace, warn};

use crate::{
    config::RegistryConfig,
    error::{RegistryError, Result},
    locks::KeyLocks,
    router::ResponseRouter,
    transport::{Inbound, PeerId, Transport},
};

/// What a CREATE did to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The entry was stored and echoed back.
    Accepted,
    /// A stored entry with an equal or higher revision was kept and echoed
    /// back instead.
    Kept,
    /// The entry failed validation and was dropped without a response.
    Invalid,
}

/// What the dispatcher did with an inbound payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Create(CreateOutcome),
    /// A query, with the entry that was returned, if any.
    Query(Option<SignedRegistryEntry>),
    /// A CREATED or RESPONSE frame, handed to observers.
    Observed(MessageType),
    /// Not a registry frame.
    Dropped,
}

/// A CREATED or RESPONSE frame seen on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedFrame {
    pub message: Message,
    pub origin: PeerId,
}

/// Registry protocol handler for one deployment.
///
/// Owns the storage backend and the transport handle; construct once and
/// share behind an `Arc`.
pub struct RegistryService<T> {
    storage: Arc<dyn RegistryStorage>,
    router: ResponseRouter<T>,
    locks: KeyLocks,
    key_format: KeyFormat,
    observed: broadcast::Sender<ObservedFrame>,
}

impl<T> fmt::Debug for RegistryService<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryService")
            .field("storage", &self.storage)
            .field("key_format", &self.key_format)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> RegistryService<T> {
    pub fn new(storage: Arc<dyn RegistryStorage>, transport: Arc<T>, config: &RegistryConfig) -> Self {
        let (observed, _) = broadcast::channel(config.observed_capacity.max(1));
        Self {
            storage,
            router: ResponseRouter::new(transport),
            locks: KeyLocks::new(),
            key_format: config.key_format,
            observed,
        }
    }

    pub fn storage(&self) -> &Arc<dyn RegistryStorage> {
        &self.storage
    }

    pub fn transport(&self) -> &Arc<T> {
        self.router.transport()
    }

    pub fn key_format(&self) -> KeyFormat {
        self.key_format
    }

    /// Subscribes to CREATED and RESPONSE frames received from peers.
    pub fn subscribe_observed(&self) -> broadcast::Receiver<ObservedFrame> {
        self.observed.subscribe()
    }

    /// Classifies one inbound payload and routes it to its handler.
    ///
    /// Payloads that are not registry frames are dropped: the flood bus is
    /// shared, so foreign traffic is expected.
    pub async fn handle_inbound(&self, bytes: Bytes, origin: &PeerId) -> Result<Dispatched> {
        let frame = match Frame::decode(bytes) {
            Ok(frame) => frame,
            Err(err) => {
                trace!(peer = %origin.fmt_short(), "dropping payload: {err}");
                return Ok(Dispatched::Dropped);
            }
        };

        match frame {
            Frame::Message(message) => match message.message_type {
                MessageType::Create => self
                    .handle_create(message.to_entry(), origin)
                    .await
                    .map(Dispatched::Create),
                message_type @ (MessageType::Created | MessageType::Response) => {
                    // No subscribers is fine; nobody is interested right now.
                    let _ = self.observed.send(ObservedFrame {
                        message,
                        origin: origin.clone(),
                    });
                    Ok(Dispatched::Observed(message_type))
                }
            },
            Frame::Query(query) => self
                .handle_query(&query.public_key, origin)
                .await
                .map(Dispatched::Query),
        }
    }

    /// Resolves a CREATE against the stored state and echoes the
    /// authoritative entry to `origin`.
    ///
    /// The incoming entry replaces the stored one only with a strictly
    /// higher revision. Either way the winner is sent back as CREATED, so
    /// the submitter learns what the registry holds.
    pub async fn handle_create(
        &self,
        entry: SignedRegistryEntry,
        origin: &PeerId,
    ) -> Result<CreateOutcome> {
        if !verify_with(&entry, self.key_format) {
            return Ok(CreateOutcome::Invalid);
        }

        let key = entry.storage_key();
        let (outcome, authoritative) = {
            let _guard = self.locks.lock(&key).await;

            let existing = self.storage.get(&key).await.map_err(RegistryError::Storage)?;
            match existing {
                Some(existing) if entry.revision <= existing.revision => {
                    debug!(
                        key = %key,
                        revision = entry.revision,
                        stored = existing.revision,
                        "keeping stored entry"
                    );
                    (CreateOutcome::Kept, existing)
                }
                _ => {
                    let stored = self
                        .storage
                        .set(&key, entry.clone())
                        .await
                        .map_err(RegistryError::Storage)?;
                    if !stored {
                        return Err(RegistryError::WriteDeclined { key });
                    }
                    info!(key = %key, revision = entry.revision, "added entry");
                    (CreateOutcome::Accepted, entry)
                }
            }
        };

        let frame = Frame::from(Message::from_entry(MessageType::Created, &authoritative));
        self.router.send_direct_or_broadcast(&frame, origin).await?;
        Ok(outcome)
    }

    /// Answers a QUERY with the stored entry. A miss sends nothing.
    pub async fn handle_query(
        &self,
        public_key: &[u8],
        origin: &PeerId,
    ) -> Result<Option<SignedRegistryEntry>> {
        let key = storage_key(public_key);
        let Some(entry) = self.storage.get(&key).await.map_err(RegistryError::Storage)? else {
            debug!(key = %key, "query miss");
            return Ok(None);
        };

        let frame = Frame::from(Message::from_entry(MessageType::Response, &entry));
        self.router.send_direct_or_broadcast(&frame, origin).await?;
        Ok(Some(entry))
    }

    /// Handles inbound payloads until the channel closes.
    ///
    /// Each payload is handled on its own task. A failed request is logged
    /// and does not affect any other. Returns once every spawned task has
    /// finished.
    pub async fn run(self: Arc<Self>, mut inbound: mpsc::Receiver<Inbound>) {
        let mut tasks = JoinSet::new();

        while let Some(Inbound { bytes, origin }) = inbound.recv().await {
            let service = Arc::clone(&self);
            tasks.spawn(async move {
                if let Err(err) = service.handle_inbound(bytes, &origin).await {
                    warn!(peer = %origin.fmt_short(), "registry request failed: {err}");
                }
            });

            // Reap finished tasks so the set does not grow unbounded.
            while let Some(result) = tasks.try_join_next() {
                log_task_failure(result);
            }
        }

        while let Some(result) = tasks.join_next().await {
            log_task_failure(result);
        }
    }
}

fn log_task_failure(result: std::result::Result<(), JoinError>) {
    if let Err(err) = result {
        warn!("registry request task failed: {err}");
    }
}

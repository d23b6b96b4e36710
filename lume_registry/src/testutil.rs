//! In-process doubles for exercising the registry service.
//!
//! - [`RecordingTransport`] records every outgoing frame instead of sending
//!   it, and lets tests decide which peers count as connected.
//! - [`CountingStorage`] wraps a backend and counts reads and writes, with
//!   switches to make it fail or decline writes.
//! - [`YieldingStorage`] wraps a backend and yields to the scheduler between
//!   a read and the following write, so concurrent read-modify-write races
//!   show up even on a single-threaded runtime.
//! - [`PanickingStorage`] panics on the first call, for exercising task
//!   failure handling.

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bytes::Bytes;
use lume_core::{Frame, RegistryStorage, SignedRegistryEntry};

use crate::transport::{PeerId, Transport};

/// A frame handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Direct { peer: PeerId, bytes: Bytes },
    Broadcast { bytes: Bytes },
}

impl Sent {
    pub fn bytes(&self) -> &Bytes {
        match self {
            Sent::Direct { bytes, .. } | Sent::Broadcast { bytes } => bytes,
        }
    }

    /// Decodes the recorded bytes.
    pub fn frame(&self) -> Frame {
        Frame::decode(self.bytes().clone()).expect("recorded frame should decode")
    }
}

#[derive(Debug, Default)]
pub struct RecordingTransport {
    connected: Mutex<HashSet<PeerId>>,
    sent: Mutex<Vec<Sent>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `peer` as having an open connection.
    pub fn connect(&self, peer: PeerId) {
        self.connected.lock().unwrap().insert(peer);
    }

    pub fn disconnect(&self, peer: &PeerId) {
        self.connected.lock().unwrap().remove(peer);
    }

    /// Makes every subsequent send and broadcast fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns and clears everything sent so far.
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    /// Returns and clears everything sent so far, decoded.
    pub fn take_frames(&self) -> Vec<Frame> {
        self.take().iter().map(Sent::frame).collect()
    }

    fn record(&self, sent: Sent) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("transport unavailable"));
        }
        self.sent.lock().unwrap().push(sent);
        Ok(())
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    type Connection = PeerId;

    fn connection(&self, peer: &PeerId) -> Option<PeerId> {
        self.connected.lock().unwrap().get(peer).cloned()
    }

    async fn send(&self, connection: &PeerId, bytes: Bytes) -> Result<()> {
        self.record(Sent::Direct {
            peer: connection.clone(),
            bytes,
        })
    }

    async fn broadcast(&self, bytes: Bytes) -> Result<()> {
        self.record(Sent::Broadcast { bytes })
    }
}

/// Storage wrapper that counts calls into the wrapped backend.
#[derive(Debug)]
pub struct CountingStorage<S> {
    inner: S,
    gets: AtomicUsize,
    sets: AtomicUsize,
    failing: AtomicBool,
    declining: AtomicBool,
}

impl<S: RegistryStorage> CountingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            sets: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            declining: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of writes that reached the wrapped backend.
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail with an error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes every subsequent write return `Ok(false)` without storing.
    pub fn set_declining(&self, declining: bool) {
        self.declining.store(declining, Ordering::SeqCst);
    }
}

#[async_trait]
impl<S: RegistryStorage> RegistryStorage for CountingStorage<S> {
    async fn get(&self, key: &str) -> Result<Option<SignedRegistryEntry>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("storage unavailable"));
        }
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, entry: SignedRegistryEntry) -> Result<bool> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("storage unavailable"));
        }
        if self.declining.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, entry).await
    }
}

/// Convenience for building a shared counting storage.
pub fn counting<S: RegistryStorage + 'static>(inner: S) -> Arc<CountingStorage<S>> {
    Arc::new(CountingStorage::new(inner))
}

/// Storage wrapper that yields after every read and before every write.
#[derive(Debug)]
pub struct YieldingStorage<S> {
    inner: S,
}

impl<S: RegistryStorage> YieldingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RegistryStorage> RegistryStorage for YieldingStorage<S> {
    async fn get(&self, key: &str) -> Result<Option<SignedRegistryEntry>> {
        let entry = self.inner.get(key).await;
        tokio::task::yield_now().await;
        entry
    }

    async fn set(&self, key: &str, entry: SignedRegistryEntry) -> Result<bool> {
        tokio::task::yield_now().await;
        self.inner.set(key, entry).await
    }
}

/// Storage wrapper that panics on its first call and delegates afterwards.
#[derive(Debug)]
pub struct PanickingStorage<S> {
    inner: S,
    armed: AtomicBool,
}

impl<S: RegistryStorage> PanickingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(true),
        }
    }

    fn trip(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            panic!("storage panicked");
        }
    }
}

#[async_trait]
impl<S: RegistryStorage> RegistryStorage for PanickingStorage<S> {
    async fn get(&self, key: &str) -> Result<Option<SignedRegistryEntry>> {
        self.trip();
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, entry: SignedRegistryEntry) -> Result<bool> {
        self.trip();
        self.inner.set(key, entry).await
    }
}

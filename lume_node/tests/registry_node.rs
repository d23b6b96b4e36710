use std::sync::Arc;

use bytes::Bytes;
use ed25519_dalek::SigningKey;
use lume_core::{
    FactoryError, Frame, Message, MessageType, Query, RegistryStorage, SignedRegistryEntry,
};
use lume_node::{build_service, config::LumeNodeConfig, default_factory, spawn_service};
use lume_registry::{
    CreateOutcome, Dispatched, Inbound, PeerId,
    testutil::{RecordingTransport, Sent},
};
use tempfile::tempdir;

fn frame_of(message_type: MessageType, entry: &SignedRegistryEntry) -> Bytes {
    Frame::from(Message::from_entry(message_type, entry))
        .encode()
        .unwrap()
}

fn single_entry(transport: &RecordingTransport, expected: MessageType) -> SignedRegistryEntry {
    let frames = transport.take_frames();
    assert_eq!(frames.len(), 1);
    match &frames[0] {
        Frame::Message(message) if message.message_type == expected => message.to_entry(),
        other => panic!("unexpected frame {other:?}"),
    }
}

#[tokio::test]
async fn default_factory_registers_builtin_backends() {
    let factory = default_factory();
    assert_eq!(
        factory.names().collect::<Vec<_>>(),
        vec!["lmdb", "memory", "redb"]
    );
}

#[tokio::test]
async fn unknown_backend_fails_construction() {
    let dir = tempdir().unwrap();
    let config = LumeNodeConfig::from_toml("[store]\ntype = \"cassandra\"\n").unwrap();

    let err = build_service(&config, dir.path(), Arc::new(RecordingTransport::new())).unwrap_err();
    assert!(matches!(err, FactoryError::UnknownBackend(name) if name == "cassandra"));
}

#[tokio::test]
async fn registry_walkthrough_on_redb() {
    let dir = tempdir().unwrap();
    let config = LumeNodeConfig::from_toml("[store]\ntype = \"redb\"\npath = \"db\"\n").unwrap();
    let transport = Arc::new(RecordingTransport::new());
    let service = build_service(&config, dir.path(), transport.clone()).unwrap();
    assert!(dir.path().join("db").join("registry.redb").exists());

    let owner = SigningKey::from_bytes(&[0x42; 32]);
    let origin = PeerId::from([0x01; 32]);
    let first = SignedRegistryEntry::signed(&owner, 1, vec![0xAA]).unwrap();
    let rival = SignedRegistryEntry::signed(&owner, 1, vec![0xBB]).unwrap();
    let second = SignedRegistryEntry::signed(&owner, 2, vec![0xCC]).unwrap();

    let dispatched = service
        .handle_inbound(frame_of(MessageType::Create, &first), &origin)
        .await
        .unwrap();
    assert_eq!(dispatched, Dispatched::Create(CreateOutcome::Accepted));
    assert_eq!(single_entry(&transport, MessageType::Created), first);

    // Same revision, different data: the stored entry wins and is echoed.
    let dispatched = service
        .handle_inbound(frame_of(MessageType::Create, &rival), &origin)
        .await
        .unwrap();
    assert_eq!(dispatched, Dispatched::Create(CreateOutcome::Kept));
    assert_eq!(single_entry(&transport, MessageType::Created), first);

    let dispatched = service
        .handle_inbound(frame_of(MessageType::Create, &second), &origin)
        .await
        .unwrap();
    assert_eq!(dispatched, Dispatched::Create(CreateOutcome::Accepted));
    assert_eq!(single_entry(&transport, MessageType::Created), second);

    let query = Frame::from(Query::new(second.public_key.clone()))
        .encode()
        .unwrap();
    let dispatched = service.handle_inbound(query, &origin).await.unwrap();
    assert_eq!(dispatched, Dispatched::Query(Some(second.clone())));
    assert_eq!(single_entry(&transport, MessageType::Response), second);
}

#[tokio::test]
async fn redb_entries_survive_service_restart() {
    let dir = tempdir().unwrap();
    let config = LumeNodeConfig::from_toml("[store]\ntype = \"lmdb\"\n").unwrap();
    let owner = SigningKey::from_bytes(&[0x07; 32]);
    let entry = SignedRegistryEntry::signed(&owner, 9, b"hello".to_vec()).unwrap();
    let origin = PeerId::from([0x02; 32]);

    {
        let transport = Arc::new(RecordingTransport::new());
        let service = build_service(&config, dir.path(), transport).unwrap();
        service.handle_create(entry.clone(), &origin).await.unwrap();
    }

    let transport = Arc::new(RecordingTransport::new());
    transport.connect(origin.clone());
    let service = build_service(&config, dir.path(), transport.clone()).unwrap();
    let found = service.handle_query(&entry.public_key, &origin).await.unwrap();
    assert_eq!(found, Some(entry.clone()));

    let sent = transport.take();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], Sent::Direct { peer, .. } if *peer == origin));
}

#[tokio::test]
async fn spawned_service_handles_deliveries() {
    let dir = tempdir().unwrap();
    let config = LumeNodeConfig::from_toml("[store]\ntype = \"memory\"\n").unwrap();
    let transport = Arc::new(RecordingTransport::new());
    let service = Arc::new(build_service(&config, dir.path(), transport.clone()).unwrap());
    let mut observed = service.subscribe_observed();

    let (tx, handle) = spawn_service(Arc::clone(&service));

    let owner = SigningKey::from_bytes(&[0x33; 32]);
    let entry = SignedRegistryEntry::signed(&owner, 3, vec![3, 3, 3]).unwrap();
    let peer = PeerId::from([0x03; 32]);
    tx.send(Inbound::new(frame_of(MessageType::Create, &entry), peer.clone()))
        .await
        .unwrap();
    tx.send(Inbound::new(frame_of(MessageType::Response, &entry), peer.clone()))
        .await
        .unwrap();

    let seen = observed.recv().await.unwrap();
    assert_eq!(seen.message.message_type, MessageType::Response);
    assert_eq!(seen.origin, peer);

    drop(tx);
    handle.await.unwrap();

    assert_eq!(single_entry(&transport, MessageType::Created), entry);
    let stored = service
        .storage()
        .get(&entry.storage_key())
        .await
        .unwrap();
    assert_eq!(stored, Some(entry));
}

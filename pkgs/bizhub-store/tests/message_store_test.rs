// Copyright 2024 BizHub Team.
//
// Comprehensive tests for MessageStore and the realtime change feed

use bizhub_store::{
    ConversationStore, MessageChange, MessageKind, MessageStatus, MessageStore, NewMessage,
    RealtimeHub, StoreError,
};
use sea_orm::DatabaseConnection;
use tempfile::NamedTempFile;

async fn create_test_db(path: &tempfile::NamedTempFile) -> DatabaseConnection {
    let db = sea_orm::Database::connect(&format!(
        "sqlite:{}?mode=rwc",
        path.path().to_str().unwrap().replace("\\", "/")
    ))
    .await
    .expect("Failed to connect to database");

    // Run migrations
    <bizhub_store::migration::Migrator as bizhub_store::migration::MigratorTrait>::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

fn text(conversation_id: &str, sender_id: &str, content: &str) -> NewMessage {
    NewMessage {
        conversation_id: conversation_id.to_string(),
        sender_id: sender_id.to_string(),
        content: content.to_string(),
        kind: MessageKind::Text,
    }
}

async fn setup(temp_file: &NamedTempFile) -> (MessageStore, String) {
    let db = create_test_db(temp_file).await;
    let conversations = ConversationStore::new(db.clone());
    let conv = conversations.create("alice", "bob", None).await.unwrap();
    (MessageStore::new(db, RealtimeHub::new()), conv.id)
}

#[tokio::test]
async fn test_insert_assigns_increasing_timestamps() {
    let temp_file = NamedTempFile::new().unwrap();
    let (store, conv_id) = setup(&temp_file).await;

    let mut sent = Vec::new();
    for i in 0..20 {
        sent.push(
            store
                .insert(text(&conv_id, "alice", &format!("msg {}", i)))
                .await
                .unwrap(),
        );
    }

    for pair in sent.windows(2) {
        assert!(pair[0].created_at < pair[1].created_at);
    }

    let history = store.messages_for(&conv_id).await.unwrap();
    let contents: Vec<_> = history.iter().map(|m| m.content.clone()).collect();
    let expected: Vec<_> = (0..20).map(|i| format!("msg {}", i)).collect();
    assert_eq!(contents, expected);
    assert!(history.iter().all(|m| m.status == MessageStatus::Sent));
}

#[tokio::test]
async fn test_insert_into_unknown_conversation() {
    let temp_file = NamedTempFile::new().unwrap();
    let (store, _) = setup(&temp_file).await;

    let result = store.insert(text("missing", "alice", "hi")).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_mark_read_skips_own_messages_and_is_idempotent() {
    let temp_file = NamedTempFile::new().unwrap();
    let (store, conv_id) = setup(&temp_file).await;

    let from_bob = store.insert(text(&conv_id, "bob", "hello")).await.unwrap();
    let from_alice = store.insert(text(&conv_id, "alice", "hey")).await.unwrap();

    let changed = store.mark_read(&conv_id, "alice").await.unwrap();
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].id, from_bob.id);
    assert_eq!(changed[0].status, MessageStatus::Read);

    let again = store.mark_read(&conv_id, "alice").await.unwrap();
    assert!(again.is_empty());

    let own = store.get(&from_alice.id).await.unwrap().unwrap();
    assert_eq!(own.status, MessageStatus::Sent);
    let theirs = store.get(&from_bob.id).await.unwrap().unwrap();
    assert_eq!(theirs.status, MessageStatus::Read);
}

#[tokio::test]
async fn test_changes_are_published() {
    let temp_file = NamedTempFile::new().unwrap();
    let (store, conv_id) = setup(&temp_file).await;
    let mut feed = store.hub().subscribe();

    let msg = store.insert(text(&conv_id, "bob", "hi")).await.unwrap();
    store.mark_read(&conv_id, "alice").await.unwrap();

    match feed.recv().await.unwrap() {
        MessageChange::Insert(m) => assert_eq!(m, msg),
        other => panic!("expected insert, got {:?}", other),
    }
    match feed.recv().await.unwrap() {
        MessageChange::Update(m) => {
            assert_eq!(m.id, msg.id);
            assert_eq!(m.status, MessageStatus::Read);
        }
        other => panic!("expected update, got {:?}", other),
    }
    assert!(feed.try_recv().is_err());
}

#[tokio::test]
async fn test_dropped_feed_unsubscribes() {
    let temp_file = NamedTempFile::new().unwrap();
    let (store, conv_id) = setup(&temp_file).await;

    let feed = store.hub().subscribe();
    let _kept = store.hub().subscribe();
    assert_eq!(store.hub().subscriber_count(), 2);

    drop(feed);
    store.insert(text(&conv_id, "bob", "hi")).await.unwrap();
    assert_eq!(store.hub().subscriber_count(), 1);
}

#[tokio::test]
async fn test_image_kind_round_trips() {
    let temp_file = NamedTempFile::new().unwrap();
    let (store, conv_id) = setup(&temp_file).await;

    let mut new = text(&conv_id, "alice", "http://localhost/a.png");
    new.kind = MessageKind::Image;
    store.insert(new).await.unwrap();

    let history = store.messages_for(&conv_id).await.unwrap();
    assert_eq!(history[0].kind, MessageKind::Image);
}

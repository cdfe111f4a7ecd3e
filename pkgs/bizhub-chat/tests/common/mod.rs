// Copyright 2024 BizHub Team.
//
// Shared fixtures for bizhub-chat integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use bizhub_chat::{ChatEvent, ChatSession, SessionUpdate};
use bizhub_store::{
    Backend, BusinessRef, ConversationRecord, ConversationRow, Message, MessageFeed, NewMessage,
    PresenceChannel, PresenceSyncs, StoreConfig, Transport,
};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tokio::sync::mpsc::UnboundedReceiver;

pub const OWNER: &str = "owner-1";
pub const CUSTOMER: &str = "cust-1";

/// Backend on a temporary database and object directory
pub struct Fixture {
    pub backend: Backend,
    pub cafe: BusinessRef,
    _db: NamedTempFile,
    pub objects: TempDir,
}

impl Fixture {
    /// Olivia owns "Joe's Cafe"; Carl is a customer
    pub async fn new() -> Self {
        let db = NamedTempFile::new().unwrap();
        let objects = TempDir::new().unwrap();
        let backend = Backend::open(StoreConfig {
            db_path: db.path().to_path_buf(),
            objects_dir: objects.path().to_path_buf(),
            public_base_url: "http://localhost:9000/public".to_string(),
        })
        .await
        .expect("Failed to open backend");

        backend.directory().upsert_user(OWNER, "Olivia").await.unwrap();
        backend.directory().upsert_user(CUSTOMER, "Carl").await.unwrap();
        let cafe = backend
            .directory()
            .create_business("Joe's Cafe", OWNER)
            .await
            .unwrap();

        Self {
            backend,
            cafe,
            _db: db,
            objects,
        }
    }
}

/// Apply events to `session` until one produces an update matching `pred`
pub async fn pump_until<F>(
    session: &mut ChatSession,
    events: &mut UnboundedReceiver<ChatEvent>,
    mut pred: F,
) -> SessionUpdate
where
    F: FnMut(&SessionUpdate) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for chat event")
            .expect("event channel closed");
        let update = session.apply_event(event).await;
        if pred(&update) {
            return update;
        }
    }
}

/// Transport wrapper that counts every call reaching the store
pub struct CountingTransport {
    pub inner: Backend,
    calls: AtomicUsize,
    uploads: AtomicUsize,
}

impl CountingTransport {
    pub fn new(inner: Backend) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for CountingTransport {
    async fn conversations_for(&self, user_id: &str) -> bizhub_store::Result<Vec<ConversationRow>> {
        self.hit();
        self.inner.conversations_for(user_id).await
    }

    async fn find_conversation(
        &self,
        a: &str,
        b: &str,
        business_id: Option<&str>,
    ) -> bizhub_store::Result<Option<ConversationRecord>> {
        self.hit();
        self.inner.find_conversation(a, b, business_id).await
    }

    async fn create_conversation(
        &self,
        initiator: &str,
        other: &str,
        business_id: Option<&str>,
    ) -> bizhub_store::Result<ConversationRecord> {
        self.hit();
        self.inner
            .create_conversation(initiator, other, business_id)
            .await
    }

    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> bizhub_store::Result<()> {
        self.hit();
        self.inner.touch_conversation(id, at).await
    }

    async fn messages_for(&self, conversation_id: &str) -> bizhub_store::Result<Vec<Message>> {
        self.hit();
        self.inner.messages_for(conversation_id).await
    }

    async fn insert_message(&self, message: NewMessage) -> bizhub_store::Result<Message> {
        self.hit();
        self.inner.insert_message(message).await
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        reader_id: &str,
    ) -> bizhub_store::Result<Vec<Message>> {
        self.hit();
        self.inner.mark_read(conversation_id, reader_id).await
    }

    async fn business(&self, id: &str) -> bizhub_store::Result<Option<BusinessRef>> {
        self.hit();
        self.inner.business(id).await
    }

    async fn search_businesses(
        &self,
        query: &str,
        limit: u64,
    ) -> bizhub_store::Result<Vec<BusinessRef>> {
        self.hit();
        self.inner.search_businesses(query, limit).await
    }

    fn subscribe_messages(&self) -> MessageFeed {
        self.hit();
        self.inner.subscribe_messages()
    }

    fn join_presence(&self, topic: &str, key: &str) -> (PresenceChannel, PresenceSyncs) {
        self.hit();
        self.inner.join_presence(topic, key)
    }

    async fn upload_object(&self, bucket: &str, path: &str, bytes: &[u8]) -> bizhub_store::Result<()> {
        self.hit();
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.inner.upload_object(bucket, path, bytes).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.inner.public_url(bucket, path)
    }
}

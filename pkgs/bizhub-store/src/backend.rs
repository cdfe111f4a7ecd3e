//! In-process backend - SQLite tables, change feed, presence and objects

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::conversation_store::ConversationStore;
use crate::directory_store::DirectoryStore;
use crate::error::Result as StoreResult;
use crate::events::{BusinessRef, ConversationRecord, ConversationRow, Message, NewMessage};
use crate::message_store::MessageStore;
use crate::object_store::ObjectStore;
use crate::presence::{PresenceChannel, PresenceHub, PresenceSyncs};
use crate::realtime::{MessageFeed, RealtimeHub};
use crate::transport::Transport;
use crate::StoreConfig;

/// All backing services behind one handle. Cheap to clone; clones share the
/// connection pool and hubs.
#[derive(Clone)]
pub struct Backend {
    directory: DirectoryStore,
    conversations: ConversationStore,
    messages: MessageStore,
    realtime: RealtimeHub,
    presence: PresenceHub,
    objects: ObjectStore,
}

impl Backend {
    /// Connect to the database in `config`, run migrations and wire the hubs
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let db_path_str = config
            .db_path
            .to_str()
            .context("Invalid database path")?
            .replace('\\', "/");

        let db_url = format!("sqlite:{}?mode=rwc", db_path_str);

        let db: DatabaseConnection = Database::connect(db_url.as_str())
            .await
            .context("Failed to connect to database")?;

        info!("Backend database opened at {}", config.db_path.display());

        Self::with_connection(db, &config).await
    }

    /// Build a backend on an existing connection
    pub async fn with_connection(db: DatabaseConnection, config: &StoreConfig) -> Result<Self> {
        crate::migration::Migrator::up(&db, None)
            .await
            .context("Failed to run migrations")?;

        tokio::fs::create_dir_all(&config.objects_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create objects directory {}",
                    config.objects_dir.display()
                )
            })?;

        let realtime = RealtimeHub::new();
        Ok(Self {
            directory: DirectoryStore::new(db.clone()),
            conversations: ConversationStore::new(db.clone()),
            messages: MessageStore::new(db, realtime.clone()),
            realtime,
            presence: PresenceHub::new(),
            objects: ObjectStore::new(&config.objects_dir, &config.public_base_url),
        })
    }

    pub fn directory(&self) -> &DirectoryStore {
        &self.directory
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn messages(&self) -> &MessageStore {
        &self.messages
    }

    pub fn realtime(&self) -> &RealtimeHub {
        &self.realtime
    }

    pub fn presence(&self) -> &PresenceHub {
        &self.presence
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }
}

#[async_trait]
impl Transport for Backend {
    async fn conversations_for(&self, user_id: &str) -> StoreResult<Vec<ConversationRow>> {
        self.conversations.rows_for(user_id).await
    }

    async fn find_conversation(
        &self,
        a: &str,
        b: &str,
        business_id: Option<&str>,
    ) -> StoreResult<Option<ConversationRecord>> {
        self.conversations.find_between(a, b, business_id).await
    }

    async fn create_conversation(
        &self,
        initiator: &str,
        other: &str,
        business_id: Option<&str>,
    ) -> StoreResult<ConversationRecord> {
        self.conversations
            .create(initiator, other, business_id)
            .await
    }

    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> StoreResult<()> {
        self.conversations.touch(id, at).await
    }

    async fn messages_for(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        self.messages.messages_for(conversation_id).await
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message> {
        self.messages.insert(message).await
    }

    async fn mark_read(&self, conversation_id: &str, reader_id: &str) -> StoreResult<Vec<Message>> {
        self.messages.mark_read(conversation_id, reader_id).await
    }

    async fn business(&self, id: &str) -> StoreResult<Option<BusinessRef>> {
        self.directory.get_business(id).await
    }

    async fn search_businesses(&self, query: &str, limit: u64) -> StoreResult<Vec<BusinessRef>> {
        self.directory.search_businesses(query, limit).await
    }

    fn subscribe_messages(&self) -> MessageFeed {
        self.realtime.subscribe()
    }

    fn join_presence(&self, topic: &str, key: &str) -> (PresenceChannel, PresenceSyncs) {
        self.presence.join(topic, key)
    }

    async fn upload_object(&self, bucket: &str, path: &str, bytes: &[u8]) -> StoreResult<()> {
        self.objects.upload(bucket, path, bytes).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.objects.public_url(bucket, path)
    }
}

//! Transport seam between the chat subsystem and its backing services
//!
//! Chat code only talks to tables, the change feed, presence and object
//! storage through this trait. [`Backend`](crate::Backend) is the in-process
//! implementation; tests wrap it to count or fail calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::events::{BusinessRef, ConversationRecord, ConversationRow, Message, NewMessage};
use crate::presence::{PresenceChannel, PresenceSyncs};
use crate::realtime::MessageFeed;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Conversations where `user_id` is a participant, joined with names and
    /// business, ordered by `last_message_at` descending
    async fn conversations_for(&self, user_id: &str) -> Result<Vec<ConversationRow>>;

    async fn find_conversation(
        &self,
        a: &str,
        b: &str,
        business_id: Option<&str>,
    ) -> Result<Option<ConversationRecord>>;

    /// Create a conversation; resolves to the existing row when the pair and
    /// business already have one
    async fn create_conversation(
        &self,
        initiator: &str,
        other: &str,
        business_id: Option<&str>,
    ) -> Result<ConversationRecord>;

    async fn touch_conversation(&self, id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Messages of a conversation ordered by `(created_at, id)`
    async fn messages_for(&self, conversation_id: &str) -> Result<Vec<Message>>;

    async fn insert_message(&self, message: NewMessage) -> Result<Message>;

    /// Flip unread messages not sent by `reader_id` to read; returns the
    /// changed rows
    async fn mark_read(&self, conversation_id: &str, reader_id: &str) -> Result<Vec<Message>>;

    async fn business(&self, id: &str) -> Result<Option<BusinessRef>>;

    async fn search_businesses(&self, query: &str, limit: u64) -> Result<Vec<BusinessRef>>;

    /// Subscribe to insert and update events on messages
    fn subscribe_messages(&self) -> MessageFeed;

    /// Join a presence topic under `key`
    fn join_presence(&self, topic: &str, key: &str) -> (PresenceChannel, PresenceSyncs);

    async fn upload_object(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<()>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

//! Message store - persistent message history with change publishing
//!
//! Every insert and status update is published on the [`RealtimeHub`] after
//! it commits, so subscribers see exactly the rows that were written.
//!
//! `created_at` is assigned here, in microseconds, and is strictly
//! increasing across all inserts made through one store. Messages are always
//! read back ordered by `(created_at, id)`.

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::*;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::entities::{conversations, messages};
use crate::error::{Result, StoreError};
use crate::events::{from_micros, Message, MessageChange, MessageStatus, NewMessage};
use crate::realtime::RealtimeHub;

impl TryFrom<messages::Model> for Message {
    type Error = StoreError;

    fn try_from(model: messages::Model) -> Result<Self> {
        Ok(Self {
            kind: model.kind.parse()?,
            status: model.status.parse()?,
            created_at: from_micros(model.created_at)?,
            id: model.id,
            conversation_id: model.conversation_id,
            sender_id: model.sender_id,
            content: model.content,
        })
    }
}

/// Message store
#[derive(Clone)]
pub struct MessageStore {
    db: DatabaseConnection,
    hub: RealtimeHub,
    last_created_at: Arc<AtomicI64>,
}

impl MessageStore {
    /// Create a message store publishing to `hub`
    pub fn new(db: DatabaseConnection, hub: RealtimeHub) -> Self {
        Self {
            db,
            hub,
            last_created_at: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Messages of a conversation, oldest first
    pub async fn messages_for(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let rows = messages::Entity::find()
            .filter(messages::Column::ConversationId.eq(conversation_id))
            .order_by_asc(messages::Column::CreatedAt)
            .order_by_asc(messages::Column::Id)
            .all(&self.db)
            .await?;

        debug!(
            "Loaded {} messages for conversation {}",
            rows.len(),
            conversation_id
        );
        rows.into_iter().map(Message::try_from).collect()
    }

    /// Get a message by ID
    pub async fn get(&self, id: &str) -> Result<Option<Message>> {
        let row = messages::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;

        row.map(Message::try_from).transpose()
    }

    /// Append a message with status `sent` and publish it
    pub async fn insert(&self, new: NewMessage) -> Result<Message> {
        let exists = conversations::Entity::find_by_id(new.conversation_id.clone())
            .one(&self.db)
            .await?
            .is_some();
        if !exists {
            return Err(StoreError::NotFound(format!(
                "conversation {}",
                new.conversation_id
            )));
        }

        let created_at = self.next_timestamp();
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: new.conversation_id,
            sender_id: new.sender_id,
            content: new.content,
            kind: new.kind,
            status: MessageStatus::Sent,
            created_at: from_micros(created_at)?,
        };

        let row = messages::ActiveModel {
            id: Set(message.id.clone()),
            conversation_id: Set(message.conversation_id.clone()),
            sender_id: Set(message.sender_id.clone()),
            content: Set(message.content.clone()),
            kind: Set(message.kind.as_str().to_string()),
            status: Set(message.status.as_str().to_string()),
            created_at: Set(created_at),
        };
        messages::Entity::insert(row)
            .exec_without_returning(&self.db)
            .await?;

        info!(
            "Stored {} message {} in conversation {}",
            message.kind, message.id, message.conversation_id
        );
        self.hub.publish(MessageChange::Insert(message.clone()));
        Ok(message)
    }

    /// Mark every unread message in a conversation that was not sent by
    /// `reader` as read. Returns the updated messages, oldest first.
    pub async fn mark_read(&self, conversation_id: &str, reader_id: &str) -> Result<Vec<Message>> {
        let unread = Condition::all()
            .add(messages::Column::ConversationId.eq(conversation_id))
            .add(messages::Column::SenderId.ne(reader_id))
            .add(messages::Column::Status.eq(MessageStatus::Sent.as_str()));

        let txn = self.db.begin().await?;

        let rows = messages::Entity::find()
            .filter(unread.clone())
            .order_by_asc(messages::Column::CreatedAt)
            .order_by_asc(messages::Column::Id)
            .all(&txn)
            .await?;

        if rows.is_empty() {
            txn.commit().await?;
            return Ok(Vec::new());
        }

        messages::Entity::update_many()
            .col_expr(
                messages::Column::Status,
                Expr::value(MessageStatus::Read.as_str()),
            )
            .filter(unread)
            .exec(&txn)
            .await?;

        txn.commit().await?;

        let updated = rows
            .into_iter()
            .map(|row| {
                Message::try_from(row).map(|mut m| {
                    m.status = MessageStatus::Read;
                    m
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for message in &updated {
            self.hub.publish(MessageChange::Update(message.clone()));
        }

        info!(
            "Marked {} messages read in conversation {} for {}",
            updated.len(),
            conversation_id,
            reader_id
        );
        Ok(updated)
    }

    /// Realtime hub this store publishes to
    pub fn hub(&self) -> &RealtimeHub {
        &self.hub
    }

    fn next_timestamp(&self) -> i64 {
        let now = Utc::now().timestamp_micros();
        let prev = self
            .last_created_at
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |prev| {
                Some(now.max(prev + 1))
            })
            .unwrap_or_else(|prev| prev);
        now.max(prev + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_conversion_rejects_unknown_status() {
        let model = messages::Model {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "u1".to_string(),
            content: "hi".to_string(),
            kind: "text".to_string(),
            status: "delivered".to_string(),
            created_at: 1,
        };
        assert!(matches!(
            Message::try_from(model),
            Err(StoreError::InvalidValue(_))
        ));
    }
}

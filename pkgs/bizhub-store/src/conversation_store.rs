//! Conversation store - two-party conversations, optionally scoped to a business

use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::*;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::directory_store::DirectoryStore;
use crate::entities::conversations;
use crate::error::{Result, StoreError};
use crate::events::{from_micros, to_micros, ConversationRecord, ConversationRow, Participant};

/// Conversation store
#[derive(Clone)]
pub struct ConversationStore {
    pub(crate) db: DatabaseConnection,
    directory: DirectoryStore,
}

impl ConversationStore {
    /// Create a conversation store on an existing connection
    pub fn new(db: DatabaseConnection) -> Self {
        let directory = DirectoryStore::new(db.clone());
        Self { db, directory }
    }

    /// Conversations where `user_id` is either participant, most recent first
    pub async fn conversations_for(&self, user_id: &str) -> Result<Vec<ConversationRecord>> {
        let convs = conversations::Entity::find()
            .filter(
                Condition::any()
                    .add(conversations::Column::Participant1Id.eq(user_id))
                    .add(conversations::Column::Participant2Id.eq(user_id)),
            )
            .order_by_desc(conversations::Column::LastMessageAt)
            .order_by_desc(conversations::Column::Id)
            .all(&self.db)
            .await?;

        convs.into_iter().map(model_to_record).collect()
    }

    /// Same as [`conversations_for`](Self::conversations_for), joined with
    /// participant names and business metadata
    pub async fn rows_for(&self, user_id: &str) -> Result<Vec<ConversationRow>> {
        let records = self.conversations_for(user_id).await?;

        let mut user_ids: Vec<String> = records
            .iter()
            .flat_map(|r| [r.participant1_id.clone(), r.participant2_id.clone()])
            .collect();
        user_ids.sort();
        user_ids.dedup();

        let mut business_ids: Vec<String> =
            records.iter().filter_map(|r| r.business_id.clone()).collect();
        business_ids.sort();
        business_ids.dedup();

        let names: HashMap<String, String> = self
            .directory
            .get_users(user_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();
        let businesses: HashMap<String, _> = self
            .directory
            .get_businesses(business_ids)
            .await?
            .into_iter()
            .map(|b| (b.id.clone(), b))
            .collect();

        let participant = |id: &str| Participant {
            id: id.to_string(),
            name: names.get(id).cloned(),
        };

        let rows = records
            .into_iter()
            .map(|record| ConversationRow {
                participant1: participant(&record.participant1_id),
                participant2: participant(&record.participant2_id),
                business: record
                    .business_id
                    .as_ref()
                    .and_then(|id| businesses.get(id).cloned()),
                record,
            })
            .collect::<Vec<_>>();

        debug!("Loaded {} conversations for {}", rows.len(), user_id);
        Ok(rows)
    }

    /// Get a single conversation by ID
    pub async fn get(&self, id: &str) -> Result<Option<ConversationRecord>> {
        let conv = conversations::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;

        conv.map(model_to_record).transpose()
    }

    /// Find the conversation between two users (either order) for a business
    pub async fn find_between(
        &self,
        a: &str,
        b: &str,
        business_id: Option<&str>,
    ) -> Result<Option<ConversationRecord>> {
        let (low, high) = ordered_pair(a, b);

        let conv = conversations::Entity::find()
            .filter(conversations::Column::ParticipantLow.eq(low))
            .filter(conversations::Column::ParticipantHigh.eq(high))
            .filter(conversations::Column::BusinessKey.eq(business_id.unwrap_or("")))
            .one(&self.db)
            .await?;

        conv.map(model_to_record).transpose()
    }

    /// Create a conversation, or return the one that already exists for the
    /// same pair and business
    pub async fn create(
        &self,
        initiator: &str,
        other: &str,
        business_id: Option<&str>,
    ) -> Result<ConversationRecord> {
        if let Some(existing) = self.find_between(initiator, other, business_id).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let (low, high) = ordered_pair(initiator, other);
        let record = ConversationRecord {
            id: uuid::Uuid::new_v4().to_string(),
            participant1_id: initiator.to_string(),
            participant2_id: other.to_string(),
            business_id: business_id.map(str::to_string),
            last_message_at: now,
            created_at: now,
        };

        let new_conv = conversations::ActiveModel {
            id: Set(record.id.clone()),
            participant1_id: Set(record.participant1_id.clone()),
            participant2_id: Set(record.participant2_id.clone()),
            business_id: Set(record.business_id.clone()),
            participant_low: Set(low.to_string()),
            participant_high: Set(high.to_string()),
            business_key: Set(business_id.unwrap_or("").to_string()),
            last_message_at: Set(to_micros(now)),
            created_at: Set(to_micros(now)),
        };

        match conversations::Entity::insert(new_conv)
            .exec_without_returning(&self.db)
            .await
        {
            Ok(_) => {
                info!(
                    "Created conversation {} between {} and {}",
                    record.id, initiator, other
                );
                Ok(record)
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // Another writer created it between our lookup and insert
                info!(
                    "Conversation between {} and {} created concurrently, reusing it",
                    initiator, other
                );
                self.find_between(initiator, other, business_id)
                    .await?
                    .ok_or_else(|| {
                        StoreError::NotFound(format!(
                            "conversation between {} and {}",
                            initiator, other
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Bump `last_message_at` for a conversation. Never moves it backwards.
    pub async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let at = to_micros(at);
        let result = conversations::Entity::update_many()
            .col_expr(conversations::Column::LastMessageAt, Expr::value(at))
            .filter(conversations::Column::Id.eq(id))
            .filter(conversations::Column::LastMessageAt.lt(at))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            if self.get(id).await?.is_none() {
                return Err(StoreError::NotFound(format!("conversation {}", id)));
            }
            debug!("Conversation {} already has newer activity", id);
            return Ok(());
        }

        debug!("Touched conversation {}", id);
        Ok(())
    }
}

fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn model_to_record(model: conversations::Model) -> Result<ConversationRecord> {
    Ok(ConversationRecord {
        id: model.id,
        participant1_id: model.participant1_id,
        participant2_id: model.participant2_id,
        business_id: model.business_id,
        last_message_at: from_micros(model.last_message_at)?,
        created_at: from_micros(model.created_at)?,
    })
}

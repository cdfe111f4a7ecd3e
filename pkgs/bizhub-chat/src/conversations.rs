//! Conversation repository - list, open and start conversations

use bizhub_store::{BusinessRef, ConversationRecord, ConversationRow, Transport};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::display::resolve_display;
use crate::error::{ChatError, Result};

/// Conversation as shown in the list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationSummary {
    pub id: String,
    pub display_name: String,
    pub initial: String,
    pub other_user_id: String,
    pub business_id: Option<String>,
    pub last_message_at: DateTime<Utc>,
}

impl ConversationSummary {
    /// Build the summary of `row` as seen by `current_user`
    pub fn from_row(row: &ConversationRow, current_user: &str) -> Self {
        let identity = resolve_display(row, current_user);
        Self {
            id: row.record.id.clone(),
            display_name: identity.display_name,
            initial: identity.initial,
            other_user_id: identity.other_user_id,
            business_id: row.record.business_id.clone(),
            last_message_at: row.record.last_message_at,
        }
    }

    /// `HH:MM` when the last message is on the same local day as `now`,
    /// otherwise `YYYY-MM-DD`
    pub fn last_activity_label<Tz>(&self, now: DateTime<Utc>, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let last = self.last_message_at.with_timezone(tz);
        if last.date_naive() == now.with_timezone(tz).date_naive() {
            last.format("%H:%M").to_string()
        } else {
            last.format("%Y-%m-%d").to_string()
        }
    }
}

/// Conversation access for one user
#[derive(Clone)]
pub struct ConversationRepository {
    transport: Arc<dyn Transport>,
    current_user: String,
    search_limit: u64,
}

impl ConversationRepository {
    pub fn new(transport: Arc<dyn Transport>, current_user: &str, search_limit: u64) -> Self {
        Self {
            transport,
            current_user: current_user.to_string(),
            search_limit,
        }
    }

    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    /// Conversations the current user takes part in, most recent first.
    /// Failures are logged and yield an empty list.
    pub async fn list_conversations(&self) -> Vec<ConversationSummary> {
        match self.transport.conversations_for(&self.current_user).await {
            Ok(rows) => {
                debug!(
                    "Listed {} conversations for {}",
                    rows.len(),
                    self.current_user
                );
                rows.iter()
                    .map(|row| ConversationSummary::from_row(row, &self.current_user))
                    .collect()
            }
            Err(e) => {
                error!("Failed to load conversations for {}: {}", self.current_user, e);
                Vec::new()
            }
        }
    }

    /// Existing conversation with `other_user_id` for the business, or a new one
    pub async fn open_conversation(
        &self,
        other_user_id: &str,
        business_id: Option<&str>,
    ) -> Result<ConversationRecord> {
        if other_user_id.is_empty() || business_id.is_some_and(str::is_empty) {
            return Err(ChatError::InvalidInput(
                "conversation needs a user id and a non-empty business id".to_string(),
            ));
        }
        if other_user_id == self.current_user {
            return Err(ChatError::SelfConversation);
        }

        if let Some(existing) = self
            .transport
            .find_conversation(&self.current_user, other_user_id, business_id)
            .await?
        {
            debug!("Reusing conversation {}", existing.id);
            return Ok(existing);
        }

        let record = self
            .transport
            .create_conversation(&self.current_user, other_user_id, business_id)
            .await?;
        info!(
            "Opened conversation {} with {} (business {:?})",
            record.id, other_user_id, business_id
        );
        Ok(record)
    }

    /// Open the conversation with a business's owner and return it as listed
    pub async fn start_chat_with_business(&self, business_id: &str) -> Result<ConversationSummary> {
        if business_id.is_empty() {
            return Err(ChatError::InvalidInput("empty business id".to_string()));
        }

        let business = self
            .transport
            .business(business_id)
            .await?
            .ok_or_else(|| ChatError::NotFound(format!("business {}", business_id)))?;

        if business.owner_id == self.current_user {
            return Err(ChatError::SelfConversation);
        }

        let record = self
            .open_conversation(&business.owner_id, Some(&business.id))
            .await?;

        self.list_conversations()
            .await
            .into_iter()
            .find(|c| c.id == record.id)
            .ok_or_else(|| ChatError::NotFound(format!("conversation {}", record.id)))
    }

    /// Businesses whose name contains `query`, case-insensitively.
    /// A blank query returns nothing without asking the store.
    pub async fn search_businesses(&self, query: &str) -> Vec<BusinessRef> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match self
            .transport
            .search_businesses(query, self.search_limit)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                error!("Business search '{}' failed: {}", query, e);
                Vec::new()
            }
        }
    }
}

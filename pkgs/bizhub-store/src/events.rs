//! Record and event types shared by the store and its consumers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// Rendering discriminator for message content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    /// `content` holds the public URL of an uploaded image
    Image,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            other => Err(StoreError::InvalidValue(format!("message kind '{}'", other))),
        }
    }
}

/// Delivery status. Only ever moves forward: `Sent` -> `Read`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Read,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Read => "read",
        }
    }

    /// Whether moving from `self` to `next` is allowed
    pub fn can_advance_to(&self, next: MessageStatus) -> bool {
        next > *self
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(MessageStatus::Sent),
            "read" => Ok(MessageStatus::Read),
            other => Err(StoreError::InvalidValue(format!("message status '{}'", other))),
        }
    }
}

/// Stored message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub kind: MessageKind,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

/// Message to be appended to a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub kind: MessageKind,
}

/// Row change delivered by the realtime feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "new", rename_all = "UPPERCASE")]
pub enum MessageChange {
    Insert(Message),
    Update(Message),
}

impl MessageChange {
    pub fn message(&self) -> &Message {
        match self {
            MessageChange::Insert(m) | MessageChange::Update(m) => m,
        }
    }
}

/// Stored conversation row, without joins
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationRecord {
    pub id: String,
    pub participant1_id: String,
    pub participant2_id: String,
    pub business_id: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participant1_id == user_id || self.participant2_id == user_id
    }
}

/// A participant as seen through the users join
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    /// `None` when the user row is missing
    pub name: Option<String>,
}

/// Business columns needed by chat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusinessRef {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

/// Conversation joined with participant and business metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationRow {
    pub record: ConversationRecord,
    pub participant1: Participant,
    pub participant2: Participant,
    pub business: Option<BusinessRef>,
}

/// Directory user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
}

pub(crate) fn to_micros(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

pub(crate) fn from_micros(value: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(value)
        .ok_or_else(|| StoreError::InvalidValue(format!("timestamp {}", value)))
}

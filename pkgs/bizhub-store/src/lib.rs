//! BizHub Store - backing services for BizHub chat
//!
//! This crate provides everything the chat subsystem talks to, behind the
//! [`Transport`] trait, with one in-process implementation ([`Backend`]).
//!
//! # Architecture
//!
//! - **DirectoryStore**: users and businesses (names, owners, search)
//! - **ConversationStore**: two-party conversations, unique per participant
//!   pair and business, ordered by last activity
//! - **MessageStore**: append-only message history with forward-only read
//!   status; every write is published on the realtime hub
//! - **RealtimeHub**: insert/update change feed for messages
//! - **PresenceHub**: ephemeral per-user state on named topics with full-state
//!   syncs
//! - **ObjectStore**: attachment blobs on disk with public URLs
//!
//! # Database Schema
//!
//! Sea-ORM over SQLite with these tables:
//!
//! - `users`: directory users
//! - `businesses`: business name and owner
//! - `conversations`: participants, optional business, last activity
//! - `messages`: content, kind, status, creation time
//!
//! Timestamps are stored as microseconds since the Unix epoch.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bizhub_store::{Backend, MessageKind, NewMessage, StoreConfig, Transport};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let backend = Backend::open(StoreConfig {
//!     db_path: "bizhub.db".into(),
//!     ..Default::default()
//! })
//! .await?;
//!
//! backend.directory().upsert_user("owner-1", "Olivia").await?;
//! backend.directory().upsert_user("cust-1", "Carl").await?;
//! let cafe = backend.directory().create_business("Joe's Cafe", "owner-1").await?;
//!
//! let conv = backend
//!     .create_conversation("cust-1", "owner-1", Some(&cafe.id))
//!     .await?;
//!
//! let mut feed = backend.subscribe_messages();
//! backend
//!     .insert_message(NewMessage {
//!         conversation_id: conv.id.clone(),
//!         sender_id: "cust-1".to_string(),
//!         content: "hi".to_string(),
//!         kind: MessageKind::Text,
//!     })
//!     .await?;
//! let change = feed.recv().await;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod conversation_store;
pub mod directory_store;
pub mod entities;
pub mod error;
pub mod message_store;
pub mod migration;
pub mod object_store;
pub mod presence;
pub mod realtime;
pub mod transport;

mod events;

pub use backend::Backend;
pub use conversation_store::ConversationStore;
pub use directory_store::DirectoryStore;
pub use error::{Result, StoreError};
pub use events::{
    BusinessRef, ConversationRecord, ConversationRow, Message, MessageChange, MessageKind,
    MessageStatus, NewMessage, Participant, UserInfo,
};
pub use message_store::MessageStore;
pub use object_store::ObjectStore;
pub use presence::{
    PresenceChannel, PresenceHub, PresenceMeta, PresencePayload, PresenceState, PresenceSyncs,
};
pub use realtime::{MessageFeed, RealtimeHub};
pub use transport::Transport;

use serde::{Deserialize, Serialize};

/// Configuration for the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: std::path::PathBuf,

    /// Directory holding object buckets (default: "bizhub-objects")
    pub objects_dir: std::path::PathBuf,

    /// Base of the public URLs handed out for objects
    pub public_base_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::path::PathBuf::from("bizhub-store.db"),
            objects_dir: std::path::PathBuf::from("bizhub-objects"),
            public_base_url: "http://localhost:8080/storage/v1/object/public".to_string(),
        }
    }
}

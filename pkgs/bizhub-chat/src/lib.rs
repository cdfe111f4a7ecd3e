//! BizHub Chat - realtime conversations between customers and businesses
//!
//! The client side of BizHub chat, written against the
//! [`Transport`](bizhub_store::Transport) trait.
//!
//! # Components
//!
//! - **ConversationRepository**: conversation list with display identities,
//!   opening conversations, business search
//! - **MessageAccess**: history, sending, read state, image attachments
//! - **RealtimeReconciler**: one message subscription and one presence
//!   channel per session, normalized into [`ChatEvent`]s
//! - **MessageTimeline**: ordered, deduplicated messages of the open
//!   conversation with date dividers
//! - **peer_status**: online/typing indicator for the other party
//! - **TypingDebouncer**: clears typing after input goes idle
//! - **ChatSession**: ties the above together for one signed-in user
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bizhub_chat::{ChatConfig, ChatSession};
//! use bizhub_store::{Backend, StoreConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let backend = Arc::new(Backend::open(StoreConfig::default()).await?);
//! let (mut session, mut events) = ChatSession::open(backend, "cust-1", ChatConfig::default());
//!
//! let conversations = session.load_conversations().await.to_vec();
//! if let Some(first) = conversations.into_iter().next() {
//!     session.select_conversation(first).await;
//!     session.send("hi").await?;
//! }
//!
//! while let Some(event) = events.recv().await {
//!     let update = session.apply_event(event).await;
//!     println!("{:?}", update);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conversations;
pub mod display;
pub mod error;
pub mod events;
pub mod messages;
pub mod presence;
pub mod realtime;
pub mod session;
pub mod timeline;
pub mod typing;

pub use config::ChatConfig;
pub use conversations::{ConversationRepository, ConversationSummary};
pub use display::{resolve_display, DisplayIdentity};
pub use error::{ChatError, Result};
pub use events::{ChatEvent, SessionUpdate};
pub use messages::MessageAccess;
pub use presence::{peer_status, PeerStatus};
pub use realtime::{RealtimeReconciler, TypingSignal};
pub use session::{ChatSession, HistoryRequest};
pub use timeline::{MessageTimeline, TimelineItem};
pub use typing::TypingDebouncer;

//! Events delivered to the presentation layer

use bizhub_store::{Message, MessageStatus, PresenceState};
use serde::{Deserialize, Serialize};

use crate::presence::PeerStatus;

/// Normalized realtime event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatEvent {
    /// A message row was inserted, in any conversation
    MessageReceived(Message),
    /// A message row was updated (status change)
    StatusUpdated(Message),
    /// Full presence state of the topic after any change
    PresenceSynced(PresenceState),
}

/// What applying a [`ChatEvent`] did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// New message added to the open timeline
    Appended(Message),
    /// Message was already in the timeline
    Duplicate { message_id: String },
    /// Someone else wrote in a conversation that is not open
    Notify {
        conversation_id: String,
        message_id: String,
    },
    /// A timeline message moved forward in status
    StatusChanged {
        message_id: String,
        status: MessageStatus,
    },
    /// Presence of the open conversation's other party
    Peer(PeerStatus),
    Unchanged,
}

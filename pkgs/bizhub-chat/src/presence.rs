//! Presence derivation for the open conversation's other party

use bizhub_store::PresenceState;
use serde::{Deserialize, Serialize};

/// Indicator shown for the other party
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    #[default]
    Offline,
    Online,
    Typing,
}

/// Status of `other_user_id` in `state` while `conversation_id` is open.
///
/// Only entries under the other party's key count. Any entry means online;
/// typing needs an entry that is typing in this very conversation.
pub fn peer_status(state: &PresenceState, other_user_id: &str, conversation_id: &str) -> PeerStatus {
    let entries = state.entries(other_user_id);
    if entries.is_empty() {
        return PeerStatus::Offline;
    }

    let typing_here = entries.iter().any(|meta| {
        meta.payload.typing && meta.payload.conversation_id.as_deref() == Some(conversation_id)
    });

    if typing_here {
        PeerStatus::Typing
    } else {
        PeerStatus::Online
    }
}

//! Chat configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a chat session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Presence topic shared by every client (default: "online-users")
    pub presence_topic: String,

    /// Bucket for image attachments (default: "chat-attachments")
    pub attachments_bucket: String,

    /// Input inactivity after which typing is cleared, in milliseconds (default: 2000)
    pub typing_idle_ms: u64,

    /// Maximum business search results (default: 10)
    pub business_search_limit: u64,
}

impl ChatConfig {
    pub fn typing_idle(&self) -> Duration {
        Duration::from_millis(self.typing_idle_ms)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            presence_topic: "online-users".to_string(),
            attachments_bucket: "chat-attachments".to_string(),
            typing_idle_ms: 2000,
            business_search_limit: 10,
        }
    }
}

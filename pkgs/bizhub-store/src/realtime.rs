//! Realtime hub - fans out message row changes to subscribers

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::events::MessageChange;

/// Receiving end of a message change subscription. Dropping it unsubscribes.
pub type MessageFeed = mpsc::UnboundedReceiver<MessageChange>;

/// In-process change feed for the `messages` table
#[derive(Clone, Default)]
pub struct RealtimeHub {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<MessageChange>>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to inserts and updates on messages
    pub fn subscribe(&self) -> MessageFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver a change to every live subscriber
    pub fn publish(&self, change: MessageChange) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        debug!(
            "Published change for message {} to {} subscribers",
            change.message().id,
            subscribers.len()
        );
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

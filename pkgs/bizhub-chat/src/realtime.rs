//! Realtime reconciler - turns store feeds into [`ChatEvent`]s
//!
//! Holds at most one message subscription and one presence channel. Each
//! feed is drained by a forwarding task that pushes normalized events onto
//! the session's event channel. Both are released on [`teardown`] or drop.
//!
//! [`teardown`]: RealtimeReconciler::teardown

use bizhub_store::{MessageChange, PresenceChannel, PresencePayload, Transport};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::events::ChatEvent;

/// Publishes typing state for one user on a joined presence channel
#[derive(Clone)]
pub struct TypingSignal {
    user_id: String,
    channel: Arc<PresenceChannel>,
}

impl TypingSignal {
    pub fn new(user_id: &str, channel: Arc<PresenceChannel>) -> Self {
        Self {
            user_id: user_id.to_string(),
            channel,
        }
    }

    pub fn send(&self, typing: bool, conversation_id: &str) {
        self.channel.track(PresencePayload::typing(
            &self.user_id,
            conversation_id,
            typing,
            Utc::now(),
        ));
        debug!(
            "Published typing={} for {} in {}",
            typing, self.user_id, conversation_id
        );
    }
}

struct PresenceLink {
    channel: Arc<PresenceChannel>,
    task: JoinHandle<()>,
}

pub struct RealtimeReconciler {
    transport: Arc<dyn Transport>,
    current_user: String,
    presence_topic: String,
    events: mpsc::UnboundedSender<ChatEvent>,
    messages: Option<JoinHandle<()>>,
    presence: Option<PresenceLink>,
}

impl RealtimeReconciler {
    pub fn new(
        transport: Arc<dyn Transport>,
        current_user: &str,
        presence_topic: &str,
        events: mpsc::UnboundedSender<ChatEvent>,
    ) -> Self {
        Self {
            transport,
            current_user: current_user.to_string(),
            presence_topic: presence_topic.to_string(),
            events,
            messages: None,
            presence: None,
        }
    }

    /// Subscribe to message changes. Returns `false` if already subscribed.
    pub fn setup_realtime(&mut self) -> bool {
        if self.messages.is_some() {
            return false;
        }

        let mut feed = self.transport.subscribe_messages();
        let events = self.events.clone();
        self.messages = Some(tokio::spawn(async move {
            while let Some(change) = feed.recv().await {
                let event = match change {
                    MessageChange::Insert(message) => ChatEvent::MessageReceived(message),
                    MessageChange::Update(message) => ChatEvent::StatusUpdated(message),
                };
                if events.send(event).is_err() {
                    break;
                }
            }
        }));

        info!("Subscribed to message changes for {}", self.current_user);
        true
    }

    /// Join the presence topic and announce ourselves online. Returns
    /// `false` if already joined.
    pub fn setup_presence(&mut self) -> bool {
        if self.presence.is_some() {
            return false;
        }

        let (channel, mut syncs) = self
            .transport
            .join_presence(&self.presence_topic, &self.current_user);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            while let Some(state) = syncs.recv().await {
                if events.send(ChatEvent::PresenceSynced(state)).is_err() {
                    break;
                }
            }
        });

        channel.track(PresencePayload::online(Utc::now()));
        self.presence = Some(PresenceLink {
            channel: Arc::new(channel),
            task,
        });

        info!(
            "Joined presence '{}' as {}",
            self.presence_topic, self.current_user
        );
        true
    }

    /// Publish typing state right away; no-op before presence is set up
    pub fn send_typing(&self, typing: bool, conversation_id: &str) {
        if let Some(signal) = self.typing_signal() {
            signal.send(typing, conversation_id);
        }
    }

    /// Handle for publishing typing state from a timer
    pub fn typing_signal(&self) -> Option<TypingSignal> {
        self.presence
            .as_ref()
            .map(|link| TypingSignal::new(&self.current_user, Arc::clone(&link.channel)))
    }

    pub fn is_subscribed(&self) -> bool {
        self.messages.is_some()
    }

    pub fn has_presence(&self) -> bool {
        self.presence.is_some()
    }

    /// Drop the message subscription and leave the presence topic
    pub fn teardown(&mut self) {
        if let Some(task) = self.messages.take() {
            task.abort();
            debug!("Message subscription closed for {}", self.current_user);
        }
        if let Some(link) = self.presence.take() {
            link.task.abort();
            link.channel.leave();
            debug!("Left presence '{}' for {}", self.presence_topic, self.current_user);
        }
    }
}

impl Drop for RealtimeReconciler {
    fn drop(&mut self) {
        self.teardown();
    }
}

//! Chat session - one user's view of their conversations
//!
//! A session owns the repository, message access, realtime state, timeline
//! and typing debouncer for a single signed-in user. Realtime events arrive
//! on the receiver returned by [`ChatSession::open`]; feed each one back
//! through [`ChatSession::apply_event`] to reconcile the open timeline.

use bizhub_store::{BusinessRef, Message, MessageKind, PresenceState, Transport};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::ChatConfig;
use crate::conversations::{ConversationRepository, ConversationSummary};
use crate::error::{ChatError, Result};
use crate::events::{ChatEvent, SessionUpdate};
use crate::messages::MessageAccess;
use crate::presence::{peer_status, PeerStatus};
use crate::realtime::RealtimeReconciler;
use crate::timeline::MessageTimeline;
use crate::typing::TypingDebouncer;

/// Ticket for a history fetch started by [`ChatSession::focus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub conversation_id: String,
    generation: u64,
}

pub struct ChatSession {
    current_user: String,
    conversations: ConversationRepository,
    messages: MessageAccess,
    realtime: RealtimeReconciler,
    timeline: MessageTimeline,
    typing: TypingDebouncer,
    listed: Vec<ConversationSummary>,
    active: Option<ConversationSummary>,
    generation: u64,
    presence: PresenceState,
}

impl ChatSession {
    /// Start a session for `current_user`. Nothing is subscribed until a
    /// conversation is selected.
    pub fn open(
        transport: Arc<dyn Transport>,
        current_user: &str,
        config: ChatConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let session = Self {
            current_user: current_user.to_string(),
            conversations: ConversationRepository::new(
                Arc::clone(&transport),
                current_user,
                config.business_search_limit,
            ),
            messages: MessageAccess::new(
                Arc::clone(&transport),
                current_user,
                &config.attachments_bucket,
            ),
            realtime: RealtimeReconciler::new(
                transport,
                current_user,
                &config.presence_topic,
                events_tx,
            ),
            timeline: MessageTimeline::new(),
            typing: TypingDebouncer::new(config.typing_idle()),
            listed: Vec::new(),
            active: None,
            generation: 0,
            presence: PresenceState::default(),
        };

        info!("Chat session opened for {}", current_user);
        (session, events_rx)
    }

    /// Release subscriptions and leave presence
    pub fn close(&mut self) {
        self.typing.cancel();
        self.realtime.teardown();
        info!("Chat session closed for {}", self.current_user);
    }

    pub fn current_user(&self) -> &str {
        &self.current_user
    }

    pub fn conversations(&self) -> &ConversationRepository {
        &self.conversations
    }

    pub fn messages(&self) -> &MessageAccess {
        &self.messages
    }

    pub fn realtime(&self) -> &RealtimeReconciler {
        &self.realtime
    }

    pub fn timeline(&self) -> &MessageTimeline {
        &self.timeline
    }

    pub fn active(&self) -> Option<&ConversationSummary> {
        self.active.as_ref()
    }

    /// Conversations from the last [`load_conversations`](Self::load_conversations)
    pub fn listed(&self) -> &[ConversationSummary] {
        &self.listed
    }

    /// Current status of the open conversation's other party
    pub fn peer_status(&self) -> Option<PeerStatus> {
        self.active
            .as_ref()
            .map(|conv| peer_status(&self.presence, &conv.other_user_id, &conv.id))
    }

    /// Refresh the conversation list
    pub async fn load_conversations(&mut self) -> &[ConversationSummary] {
        self.listed = self.conversations.list_conversations().await;
        &self.listed
    }

    pub async fn search_businesses(&self, query: &str) -> Vec<BusinessRef> {
        self.conversations.search_businesses(query).await
    }

    /// Open (or create) the conversation with a business and select it
    pub async fn start_chat_with_business(&mut self, business_id: &str) -> Result<ConversationSummary> {
        let summary = self
            .conversations
            .start_chat_with_business(business_id)
            .await?;
        self.load_conversations().await;
        self.select_conversation(summary.clone()).await;
        Ok(summary)
    }

    /// Make `summary` the open conversation and load its history. Returns
    /// `false` if another conversation was focused while loading.
    pub async fn select_conversation(&mut self, summary: ConversationSummary) -> bool {
        let request = self.focus(summary);
        let history = self.messages.list_messages(&request.conversation_id).await;
        if !self.show_history(&request, history) {
            return false;
        }

        self.messages.mark_as_read(&request.conversation_id).await;
        self.realtime.setup_realtime();
        self.realtime.setup_presence();
        true
    }

    /// Switch the open conversation. Any fetch started for an earlier focus
    /// is superseded, and pending typing state for it is cleared.
    pub fn focus(&mut self, summary: ConversationSummary) -> HistoryRequest {
        self.typing.flush();
        self.generation += 1;
        self.timeline.reset(&summary.id, Vec::new());

        debug!(
            "Focused conversation {} ({})",
            summary.id, summary.display_name
        );
        let request = HistoryRequest {
            conversation_id: summary.id.clone(),
            generation: self.generation,
        };
        self.active = Some(summary);
        request
    }

    /// Render fetched history if `request` is still the latest focus.
    /// Messages that arrived live since the focus are kept.
    pub fn show_history(&mut self, request: &HistoryRequest, history: Vec<Message>) -> bool {
        if request.generation != self.generation {
            debug!(
                "Discarding stale history for {} (generation {} < {})",
                request.conversation_id, request.generation, self.generation
            );
            return false;
        }

        let live = self.timeline.messages().to_vec();
        self.timeline.reset(&request.conversation_id, history);
        for message in live {
            self.timeline.insert(message);
        }
        true
    }

    /// Send text to the open conversation
    pub async fn send(&mut self, content: &str) -> Result<Message> {
        let conversation_id = self.active_id()?;
        if content.trim().is_empty() {
            return Err(ChatError::InvalidInput("empty message".to_string()));
        }

        let message = self
            .messages
            .send_message(content.trim(), &conversation_id, MessageKind::Text)
            .await
            .ok_or_else(|| ChatError::SendFailed(conversation_id.clone()))?;

        self.timeline.insert(message.clone());
        Ok(message)
    }

    /// Upload an image and send it to the open conversation
    pub async fn send_attachment(&mut self, file_name: &str, bytes: &[u8]) -> Result<Message> {
        let conversation_id = self.active_id()?;
        let message = self
            .messages
            .send_attachment(file_name, bytes, &conversation_id)
            .await?;

        self.timeline.insert(message.clone());
        Ok(message)
    }

    /// Keystroke in the composer. No-op until presence is joined.
    pub fn on_input(&mut self) {
        let Some(conversation_id) = self.active.as_ref().map(|c| c.id.clone()) else {
            return;
        };
        if let Some(signal) = self.realtime.typing_signal() {
            self.typing.on_input(signal, &conversation_id);
        }
    }

    /// Reconcile one realtime event with the session state
    pub async fn apply_event(&mut self, event: ChatEvent) -> SessionUpdate {
        match event {
            ChatEvent::MessageReceived(message) => self.on_message(message).await,
            ChatEvent::StatusUpdated(message) => {
                if self.timeline.apply_status(&message) {
                    SessionUpdate::StatusChanged {
                        message_id: message.id,
                        status: message.status,
                    }
                } else {
                    SessionUpdate::Unchanged
                }
            }
            ChatEvent::PresenceSynced(state) => {
                self.presence = state;
                match self.peer_status() {
                    Some(status) => SessionUpdate::Peer(status),
                    None => SessionUpdate::Unchanged,
                }
            }
        }
    }

    async fn on_message(&mut self, message: Message) -> SessionUpdate {
        let is_active = self
            .active
            .as_ref()
            .is_some_and(|c| c.id == message.conversation_id);
        let from_other = message.sender_id != self.current_user;

        if !is_active {
            if from_other && self.is_participant(&message.conversation_id).await {
                return SessionUpdate::Notify {
                    conversation_id: message.conversation_id,
                    message_id: message.id,
                };
            }
            return SessionUpdate::Unchanged;
        }

        if !self.timeline.insert(message.clone()) {
            return SessionUpdate::Duplicate {
                message_id: message.id,
            };
        }

        if from_other {
            self.messages.mark_as_read(&message.conversation_id).await;
        }
        SessionUpdate::Appended(message)
    }

    /// Whether `conversation_id` is one of ours. An unknown id refreshes the
    /// list once, since it may be a conversation someone just started with us.
    async fn is_participant(&mut self, conversation_id: &str) -> bool {
        if self.listed.iter().any(|c| c.id == conversation_id) {
            return true;
        }
        self.load_conversations()
            .await
            .iter()
            .any(|c| c.id == conversation_id)
    }

    fn active_id(&self) -> Result<String> {
        self.active
            .as_ref()
            .map(|c| c.id.clone())
            .ok_or(ChatError::NoActiveConversation)
    }
}

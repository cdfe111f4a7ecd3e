//! Message timeline - ordered, deduplicated view of the open conversation
//!
//! Messages are kept sorted by `(created_at, id)` whatever order they arrive
//! in. Every message id that entered the timeline is remembered, so a
//! realtime echo of a message already shown (our own send, a replayed
//! delivery) is rejected.

use bizhub_store::Message;
use chrono::{NaiveDate, TimeZone, Utc};
use std::collections::HashSet;

/// One rendered row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineItem {
    /// Local calendar date starting here
    DateDivider(NaiveDate),
    Message(Message),
}

#[derive(Debug, Default)]
pub struct MessageTimeline {
    conversation_id: Option<String>,
    messages: Vec<Message>,
    seen: HashSet<String>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `history` of `conversation_id`
    pub fn reset(&mut self, conversation_id: &str, history: Vec<Message>) {
        self.conversation_id = Some(conversation_id.to_string());
        self.messages.clear();
        self.seen.clear();
        for message in history {
            self.insert(message);
        }
    }

    /// Forget everything, no conversation open
    pub fn clear(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
        self.seen.clear();
    }

    /// Add a message in order. Returns `false` for a message of another
    /// conversation or one already seen.
    pub fn insert(&mut self, message: Message) -> bool {
        if self.conversation_id.as_deref() != Some(message.conversation_id.as_str()) {
            return false;
        }
        if !self.seen.insert(message.id.clone()) {
            return false;
        }

        let pos = self
            .messages
            .partition_point(|m| (m.created_at, &m.id) < (message.created_at, &message.id));
        self.messages.insert(pos, message);
        true
    }

    /// Apply a status update to a known message. Only forward transitions
    /// are accepted.
    pub fn apply_status(&mut self, update: &Message) -> bool {
        match self.messages.iter_mut().find(|m| m.id == update.id) {
            Some(existing) if existing.status.can_advance_to(update.status) => {
                existing.status = update.status;
                true
            }
            _ => false,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Rendered rows with a divider whenever the local date in `tz` changes
    pub fn items_in<Tz: TimeZone>(&self, tz: &Tz) -> Vec<TimelineItem> {
        let mut items = Vec::with_capacity(self.messages.len() + 1);
        let mut current_day: Option<NaiveDate> = None;

        for message in &self.messages {
            let day = message.created_at.with_timezone(tz).date_naive();
            if current_day != Some(day) {
                items.push(TimelineItem::DateDivider(day));
                current_day = Some(day);
            }
            items.push(TimelineItem::Message(message.clone()));
        }

        items
    }

    /// Rendered rows with UTC day boundaries
    pub fn items(&self) -> Vec<TimelineItem> {
        self.items_in(&Utc)
    }
}

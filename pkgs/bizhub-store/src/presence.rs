//! Presence hub - ephemeral per-key state on shared topics
//!
//! A client joins a topic under a key (its user identity) and gets a
//! [`PresenceChannel`] plus a stream of full-state snapshots. Each joined
//! channel owns at most one entry under its key, identified by a presence
//! ref; tracking again replaces that entry. Several channels may share a key
//! (multiple tabs/devices), so a key maps to a list of entries.
//!
//! Every track, untrack or leave pushes the complete [`PresenceState`] of
//! the topic to every channel joined to it. Dropping a channel leaves the
//! topic, which is how a disconnect clears its entry.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// State published by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresencePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub online_at: DateTime<Utc>,
    pub typing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl PresencePayload {
    /// Plain "I'm here" record
    pub fn online(at: DateTime<Utc>) -> Self {
        Self {
            user_id: None,
            online_at: at,
            typing: false,
            conversation_id: None,
        }
    }

    /// Typing state for a conversation
    pub fn typing(user_id: &str, conversation_id: &str, typing: bool, at: DateTime<Utc>) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            online_at: at,
            typing,
            conversation_id: Some(conversation_id.to_string()),
        }
    }
}

/// One tracked entry in a synced state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceMeta {
    pub presence_ref: String,
    #[serde(flatten)]
    pub payload: PresencePayload,
}

/// Full presence state of a topic, keyed by client key
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceState(BTreeMap<String, Vec<PresenceMeta>>);

impl PresenceState {
    /// Entries tracked under `key`, in join order
    pub fn entries(&self, key: &str) -> &[PresenceMeta] {
        self.0.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PresenceMeta])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(String, Vec<PresenceMeta>)> for PresenceState {
    fn from_iter<I: IntoIterator<Item = (String, Vec<PresenceMeta>)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .filter(|(_, metas)| !metas.is_empty())
                .collect(),
        )
    }
}

/// Receiving end of presence syncs for one joined channel
pub type PresenceSyncs = mpsc::UnboundedReceiver<PresenceState>;

#[derive(Default)]
struct Topic {
    members: BTreeMap<String, Vec<(String, PresencePayload)>>,
    listeners: HashMap<String, mpsc::UnboundedSender<PresenceState>>,
}

impl Topic {
    fn snapshot(&self) -> PresenceState {
        self.members
            .iter()
            .map(|(key, entries)| {
                let metas = entries
                    .iter()
                    .map(|(presence_ref, payload)| PresenceMeta {
                        presence_ref: presence_ref.clone(),
                        payload: payload.clone(),
                    })
                    .collect();
                (key.clone(), metas)
            })
            .collect()
    }

    fn broadcast(&mut self) {
        let state = self.snapshot();
        self.listeners.retain(|_, tx| tx.send(state.clone()).is_ok());
    }

    fn remove_entry(&mut self, key: &str, presence_ref: &str) -> bool {
        let Some(entries) = self.members.get_mut(key) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(r, _)| r != presence_ref);
        let removed = entries.len() != before;
        if entries.is_empty() {
            self.members.remove(key);
        }
        removed
    }
}

/// In-process presence service
#[derive(Clone, Default)]
pub struct PresenceHub {
    topics: Arc<Mutex<HashMap<String, Topic>>>,
}

impl PresenceHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `topic` under `key`. The returned stream immediately yields the
    /// current state, then one snapshot per change.
    pub fn join(&self, topic: &str, key: &str) -> (PresenceChannel, PresenceSyncs) {
        let presence_ref = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut topics = self.topics.lock();
            let entry = topics.entry(topic.to_string()).or_default();
            let _ = tx.send(entry.snapshot());
            entry.listeners.insert(presence_ref.clone(), tx);
        }

        info!("Joined presence topic '{}' as {} ({})", topic, key, presence_ref);

        let channel = PresenceChannel {
            hub: self.clone(),
            topic: topic.to_string(),
            key: key.to_string(),
            presence_ref,
            left: AtomicBool::new(false),
        };
        (channel, rx)
    }

    /// Current state of a topic
    pub fn state(&self, topic: &str) -> PresenceState {
        self.topics
            .lock()
            .get(topic)
            .map(Topic::snapshot)
            .unwrap_or_default()
    }

    fn track(&self, topic: &str, key: &str, presence_ref: &str, payload: PresencePayload) {
        let mut topics = self.topics.lock();
        let Some(entry) = topics.get_mut(topic) else {
            return;
        };

        let entries = entry.members.entry(key.to_string()).or_default();
        match entries.iter_mut().find(|(r, _)| r == presence_ref) {
            Some((_, existing)) => *existing = payload,
            None => entries.push((presence_ref.to_string(), payload)),
        }

        entry.broadcast();
        debug!("Tracked presence for {} on '{}'", key, topic);
    }

    fn untrack(&self, topic: &str, key: &str, presence_ref: &str) {
        let mut topics = self.topics.lock();
        if let Some(entry) = topics.get_mut(topic) {
            if entry.remove_entry(key, presence_ref) {
                entry.broadcast();
            }
        }
    }

    fn leave(&self, topic: &str, key: &str, presence_ref: &str) {
        let mut topics = self.topics.lock();
        let Some(entry) = topics.get_mut(topic) else {
            return;
        };

        entry.listeners.remove(presence_ref);
        if entry.remove_entry(key, presence_ref) {
            entry.broadcast();
        }
        if entry.listeners.is_empty() && entry.members.is_empty() {
            topics.remove(topic);
        }

        info!("Left presence topic '{}' as {} ({})", topic, key, presence_ref);
    }
}

/// A joined presence topic. Leaves the topic when dropped.
pub struct PresenceChannel {
    hub: PresenceHub,
    topic: String,
    key: String,
    presence_ref: String,
    left: AtomicBool,
}

impl PresenceChannel {
    /// Publish (or replace) this channel's entry
    pub fn track(&self, payload: PresencePayload) {
        if self.left.load(Ordering::Acquire) {
            return;
        }
        self.hub
            .track(&self.topic, &self.key, &self.presence_ref, payload);
    }

    /// Remove this channel's entry but stay joined
    pub fn untrack(&self) {
        self.hub.untrack(&self.topic, &self.key, &self.presence_ref);
    }

    /// Current state of the topic
    pub fn state(&self) -> PresenceState {
        self.hub.state(&self.topic)
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn presence_ref(&self) -> &str {
        &self.presence_ref
    }

    /// Leave the topic; later calls are no-ops
    pub fn leave(&self) {
        if !self.left.swap(true, Ordering::AcqRel) {
            self.hub.leave(&self.topic, &self.key, &self.presence_ref);
        }
    }
}

impl Drop for PresenceChannel {
    fn drop(&mut self) {
        self.leave();
    }
}

//! Message access - history, sending, read state and image attachments

use bizhub_store::{Message, MessageKind, NewMessage, Transport};
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{ChatError, Result};

const ATTACHMENT_SUFFIX_LEN: usize = 10;

/// Message operations for one user
#[derive(Clone)]
pub struct MessageAccess {
    transport: Arc<dyn Transport>,
    current_user: String,
    attachments_bucket: String,
}

impl MessageAccess {
    pub fn new(transport: Arc<dyn Transport>, current_user: &str, attachments_bucket: &str) -> Self {
        Self {
            transport,
            current_user: current_user.to_string(),
            attachments_bucket: attachments_bucket.to_string(),
        }
    }

    /// History of a conversation, oldest first. Failures yield an empty list.
    pub async fn list_messages(&self, conversation_id: &str) -> Vec<Message> {
        match self.transport.messages_for(conversation_id).await {
            Ok(messages) => messages,
            Err(e) => {
                error!("Failed to load messages for {}: {}", conversation_id, e);
                Vec::new()
            }
        }
    }

    /// Send a message as the current user.
    ///
    /// Content is trimmed. Blank content or an empty conversation id returns
    /// `None` without touching the store. On success the conversation's `last_message_at`
    /// is bumped in the background.
    pub async fn send_message(
        &self,
        content: &str,
        conversation_id: &str,
        kind: MessageKind,
    ) -> Option<Message> {
        let content = content.trim();
        if content.is_empty() || conversation_id.is_empty() {
            debug!("Ignoring empty message for '{}'", conversation_id);
            return None;
        }

        let new = NewMessage {
            conversation_id: conversation_id.to_string(),
            sender_id: self.current_user.clone(),
            content: content.to_string(),
            kind,
        };

        let message = match self.transport.insert_message(new).await {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to send message to {}: {}", conversation_id, e);
                return None;
            }
        };

        let transport = Arc::clone(&self.transport);
        let conversation_id = message.conversation_id.clone();
        let at = message.created_at;
        tokio::spawn(async move {
            if let Err(e) = transport.touch_conversation(&conversation_id, at).await {
                warn!(
                    "Failed to update last_message_at for {}: {}",
                    conversation_id, e
                );
            }
        });

        Some(message)
    }

    /// Mark messages from the other party as read. Returns how many changed.
    pub async fn mark_as_read(&self, conversation_id: &str) -> u64 {
        if conversation_id.is_empty() {
            return 0;
        }

        match self
            .transport
            .mark_read(conversation_id, &self.current_user)
            .await
        {
            Ok(changed) => changed.len() as u64,
            Err(e) => {
                error!("Failed to mark {} as read: {}", conversation_id, e);
                0
            }
        }
    }

    /// Upload an image and send its public URL as an image message
    pub async fn send_attachment(
        &self,
        file_name: &str,
        bytes: &[u8],
        conversation_id: &str,
    ) -> Result<Message> {
        if conversation_id.is_empty() {
            return Err(ChatError::InvalidInput("empty conversation id".to_string()));
        }

        let is_image = mime_guess::from_path(file_name)
            .first()
            .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE);
        if !is_image {
            return Err(ChatError::NotAnImage(file_name.to_string()));
        }

        let path = attachment_path(&self.attachments_bucket, file_name);
        self.transport
            .upload_object(&self.attachments_bucket, &path, bytes)
            .await?;
        let url = self.transport.public_url(&self.attachments_bucket, &path);

        info!("Uploaded attachment {} ({} bytes)", path, bytes.len());

        self.send_message(&url, conversation_id, MessageKind::Image)
            .await
            .ok_or_else(|| ChatError::SendFailed(conversation_id.to_string()))
    }
}

/// `<bucket>/<millis>_<random>.<ext>`
fn attachment_path(bucket: &str, file_name: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ATTACHMENT_SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase();

    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");

    format!(
        "{}/{}_{}.{}",
        bucket,
        Utc::now().timestamp_millis(),
        suffix,
        ext
    )
}

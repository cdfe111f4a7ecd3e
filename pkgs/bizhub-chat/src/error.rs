//! Error types for chat operations

use bizhub_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the chat subsystem
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Cannot start a conversation with yourself")]
    SelfConversation,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No conversation is open")]
    NoActiveConversation,
    #[error("Not an image: {0}")]
    NotAnImage(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Message send failed for conversation {0}")]
    SendFailed(String),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ChatError>;

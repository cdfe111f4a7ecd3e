// Copyright 2024 BizHub Team.
//
// Comprehensive tests for MessageAccess

mod common;

use bizhub_chat::{ChatError, MessageAccess};
use bizhub_store::{MessageKind, MessageStatus, Transport};
use common::{CountingTransport, Fixture, CUSTOMER, OWNER};
use std::sync::Arc;
use std::time::Duration;

async fn conversation(fx: &Fixture) -> String {
    fx.backend
        .create_conversation(CUSTOMER, OWNER, Some(&fx.cafe.id))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_empty_send_never_reaches_store() {
    let fx = Fixture::new().await;
    let conv_id = conversation(&fx).await;
    let counting = Arc::new(CountingTransport::new(fx.backend.clone()));
    let access = MessageAccess::new(counting.clone(), CUSTOMER, "chat-attachments");

    assert!(access.send_message("", &conv_id, MessageKind::Text).await.is_none());
    assert!(access.send_message("   \n", &conv_id, MessageKind::Text).await.is_none());
    assert!(access.send_message("hi", "", MessageKind::Text).await.is_none());
    assert_eq!(access.mark_as_read("").await, 0);

    assert_eq!(counting.calls(), 0);
}

#[tokio::test]
async fn test_send_bumps_conversation_in_background() {
    let fx = Fixture::new().await;
    let conv_id = conversation(&fx).await;
    let before = fx.backend.conversations().get(&conv_id).await.unwrap().unwrap();

    let access = MessageAccess::new(Arc::new(fx.backend.clone()), CUSTOMER, "chat-attachments");
    let sent = access
        .send_message("hi", &conv_id, MessageKind::Text)
        .await
        .unwrap();
    assert_eq!(sent.sender_id, CUSTOMER);
    assert_eq!(sent.status, MessageStatus::Sent);

    let mut bumped = false;
    for _ in 0..50 {
        let conv = fx.backend.conversations().get(&conv_id).await.unwrap().unwrap();
        if conv.last_message_at == sent.created_at {
            bumped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(bumped);
    assert!(sent.created_at >= before.last_message_at);
}

#[tokio::test]
async fn test_send_to_unknown_conversation_returns_none() {
    let fx = Fixture::new().await;
    let access = MessageAccess::new(Arc::new(fx.backend.clone()), CUSTOMER, "chat-attachments");

    assert!(access
        .send_message("hi", "no-such-conversation", MessageKind::Text)
        .await
        .is_none());
}

#[tokio::test]
async fn test_list_messages_in_order() {
    let fx = Fixture::new().await;
    let conv_id = conversation(&fx).await;
    let customer = MessageAccess::new(Arc::new(fx.backend.clone()), CUSTOMER, "chat-attachments");
    let owner = MessageAccess::new(Arc::new(fx.backend.clone()), OWNER, "chat-attachments");

    owner.send_message("hi", &conv_id, MessageKind::Text).await.unwrap();
    customer.send_message("hello", &conv_id, MessageKind::Text).await.unwrap();
    owner.send_message("how can I help?", &conv_id, MessageKind::Text).await.unwrap();

    let history = customer.list_messages(&conv_id).await;
    let contents: Vec<_> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hi", "hello", "how can I help?"]);

    assert!(customer.list_messages("no-such-conversation").await.is_empty());
}

#[tokio::test]
async fn test_mark_as_read_is_idempotent() {
    let fx = Fixture::new().await;
    let conv_id = conversation(&fx).await;
    let customer = MessageAccess::new(Arc::new(fx.backend.clone()), CUSTOMER, "chat-attachments");
    let owner = MessageAccess::new(Arc::new(fx.backend.clone()), OWNER, "chat-attachments");

    owner.send_message("one", &conv_id, MessageKind::Text).await.unwrap();
    owner.send_message("two", &conv_id, MessageKind::Text).await.unwrap();
    customer.send_message("mine", &conv_id, MessageKind::Text).await.unwrap();

    assert_eq!(customer.mark_as_read(&conv_id).await, 2);
    assert_eq!(customer.mark_as_read(&conv_id).await, 0);

    let history = customer.list_messages(&conv_id).await;
    for message in history {
        let expected = if message.sender_id == CUSTOMER {
            MessageStatus::Sent
        } else {
            MessageStatus::Read
        };
        assert_eq!(message.status, expected, "status of '{}'", message.content);
    }
}

#[tokio::test]
async fn test_image_attachment_is_uploaded_and_sent() {
    let fx = Fixture::new().await;
    let conv_id = conversation(&fx).await;
    let counting = Arc::new(CountingTransport::new(fx.backend.clone()));
    let access = MessageAccess::new(counting.clone(), CUSTOMER, "chat-attachments");

    let sent = access
        .send_attachment("latte.png", b"\x89PNG fake", &conv_id)
        .await
        .unwrap();

    assert_eq!(counting.uploads(), 1);
    assert_eq!(sent.kind, MessageKind::Image);
    let prefix = "http://localhost:9000/public/chat-attachments/chat-attachments/";
    assert!(sent.content.starts_with(prefix), "url was {}", sent.content);
    assert!(sent.content.ends_with(".png"));

    let object_path = sent.content.strip_prefix(prefix).unwrap();
    let bytes = fx
        .backend
        .objects()
        .download("chat-attachments", &format!("chat-attachments/{}", object_path))
        .await
        .unwrap();
    assert_eq!(bytes, b"\x89PNG fake");
}

#[tokio::test]
async fn test_non_image_attachment_rejected_before_upload() {
    let fx = Fixture::new().await;
    let conv_id = conversation(&fx).await;
    let counting = Arc::new(CountingTransport::new(fx.backend.clone()));
    let access = MessageAccess::new(counting.clone(), CUSTOMER, "chat-attachments");

    let result = access.send_attachment("notes.txt", b"hello", &conv_id).await;
    assert!(matches!(result, Err(ChatError::NotAnImage(_))));

    let result = access.send_attachment("no-extension", b"hello", &conv_id).await;
    assert!(matches!(result, Err(ChatError::NotAnImage(_))));

    assert_eq!(counting.calls(), 0);
}

#[tokio::test]
async fn test_attachment_to_unknown_conversation_fails_send() {
    let fx = Fixture::new().await;
    let access = MessageAccess::new(Arc::new(fx.backend.clone()), CUSTOMER, "chat-attachments");

    let result = access
        .send_attachment("latte.jpg", b"jpeg", "no-such-conversation")
        .await;
    assert!(matches!(result, Err(ChatError::SendFailed(_))));
}

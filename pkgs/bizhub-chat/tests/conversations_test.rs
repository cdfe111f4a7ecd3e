// Copyright 2024 BizHub Team.
//
// Comprehensive tests for ConversationRepository

mod common;

use bizhub_chat::{ChatError, ConversationRepository};
use bizhub_store::Transport;
use common::{CountingTransport, Fixture, CUSTOMER, OWNER};
use std::sync::Arc;

fn repo(fx: &Fixture, user: &str) -> ConversationRepository {
    ConversationRepository::new(Arc::new(fx.backend.clone()), user, 10)
}

#[tokio::test]
async fn test_list_shows_viewer_specific_names() {
    let fx = Fixture::new().await;
    fx.backend.directory().upsert_user("dana", "dana").await.unwrap();
    fx.backend
        .create_conversation(CUSTOMER, OWNER, Some(&fx.cafe.id))
        .await
        .unwrap();
    fx.backend
        .create_conversation("dana", OWNER, None)
        .await
        .unwrap();

    let owner_list = repo(&fx, OWNER).list_conversations().await;
    let mut names: Vec<_> = owner_list.iter().map(|c| c.display_name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Carl", "dana"]);
    let dana = owner_list.iter().find(|c| c.other_user_id == "dana").unwrap();
    assert_eq!(dana.initial, "D");
    assert_eq!(dana.business_id, None);

    let customer_list = repo(&fx, CUSTOMER).list_conversations().await;
    assert_eq!(customer_list.len(), 1);
    assert_eq!(customer_list[0].display_name, "Joe's Cafe");
    assert_eq!(customer_list[0].business_id.as_deref(), Some(fx.cafe.id.as_str()));

    assert!(repo(&fx, "stranger").list_conversations().await.is_empty());
}

#[tokio::test]
async fn test_list_orders_by_last_activity() {
    let fx = Fixture::new().await;
    let first = fx
        .backend
        .create_conversation(CUSTOMER, OWNER, None)
        .await
        .unwrap();
    let second = fx
        .backend
        .create_conversation(CUSTOMER, "dana", None)
        .await
        .unwrap();

    fx.backend
        .touch_conversation(&first.id, chrono::Utc::now() + chrono::Duration::minutes(1))
        .await
        .unwrap();

    let ids: Vec<_> = repo(&fx, CUSTOMER)
        .list_conversations()
        .await
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[tokio::test]
async fn test_open_conversation_is_idempotent() {
    let fx = Fixture::new().await;
    let customer = repo(&fx, CUSTOMER);
    let owner = repo(&fx, OWNER);

    let a = customer
        .open_conversation(OWNER, Some(&fx.cafe.id))
        .await
        .unwrap();
    let b = customer
        .open_conversation(OWNER, Some(&fx.cafe.id))
        .await
        .unwrap();
    let c = owner
        .open_conversation(CUSTOMER, Some(&fx.cafe.id))
        .await
        .unwrap();

    assert_eq!(a.id, b.id);
    assert_eq!(a.id, c.id);
    assert_eq!(customer.list_conversations().await.len(), 1);
}

#[tokio::test]
async fn test_racing_opens_yield_one_conversation() {
    let fx = Fixture::new().await;
    let customer = repo(&fx, CUSTOMER);
    let owner = repo(&fx, OWNER);
    let biz = fx.cafe.id.clone();

    let (a, b) = tokio::join!(
        customer.open_conversation(OWNER, Some(&biz)),
        owner.open_conversation(CUSTOMER, Some(&biz)),
    );

    assert_eq!(a.unwrap().id, b.unwrap().id);
    assert_eq!(customer.list_conversations().await.len(), 1);
}

#[tokio::test]
async fn test_open_conversation_rejects_bad_input() {
    let fx = Fixture::new().await;
    let counting = Arc::new(CountingTransport::new(fx.backend.clone()));
    let customer = ConversationRepository::new(counting.clone(), CUSTOMER, 10);

    assert!(matches!(
        customer.open_conversation(CUSTOMER, None).await,
        Err(ChatError::SelfConversation)
    ));
    assert!(matches!(
        customer.open_conversation("", None).await,
        Err(ChatError::InvalidInput(_))
    ));
    assert!(matches!(
        customer.open_conversation(OWNER, Some("")).await,
        Err(ChatError::InvalidInput(_))
    ));
    assert_eq!(counting.calls(), 0);
}

#[tokio::test]
async fn test_start_chat_with_business() {
    let fx = Fixture::new().await;

    let summary = repo(&fx, CUSTOMER)
        .start_chat_with_business(&fx.cafe.id)
        .await
        .unwrap();
    assert_eq!(summary.display_name, "Joe's Cafe");
    assert_eq!(summary.other_user_id, OWNER);

    let again = repo(&fx, CUSTOMER)
        .start_chat_with_business(&fx.cafe.id)
        .await
        .unwrap();
    assert_eq!(again.id, summary.id);

    assert!(matches!(
        repo(&fx, OWNER).start_chat_with_business(&fx.cafe.id).await,
        Err(ChatError::SelfConversation)
    ));
    assert!(matches!(
        repo(&fx, CUSTOMER).start_chat_with_business("missing").await,
        Err(ChatError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_search_businesses() {
    let fx = Fixture::new().await;
    fx.backend
        .directory()
        .create_business("Cafe Luna", "someone")
        .await
        .unwrap();
    fx.backend
        .directory()
        .create_business("Bike Repair", "someone")
        .await
        .unwrap();

    let counting = Arc::new(CountingTransport::new(fx.backend.clone()));
    let customer = ConversationRepository::new(counting.clone(), CUSTOMER, 10);

    assert!(customer.search_businesses("   ").await.is_empty());
    assert_eq!(counting.calls(), 0);

    let mut names: Vec<_> = customer
        .search_businesses(" cafe ")
        .await
        .into_iter()
        .map(|b| b.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["Cafe Luna", "Joe's Cafe"]);
    assert_eq!(counting.calls(), 1);
}

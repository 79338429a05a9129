#![allow(clippy::unwrap_used)]
use marketplace_messaging::config::RealtimeBackend;
use serde_json::json;
use std::collections::HashSet;
use uuid::Uuid;
mod common;

#[tokio::test]
async fn test_send_publishes_message_and_notification_events() {
    let Some(app) = common::TestApp::spawn().await else { return };
    let alice = app.create_user("Alice").await;
    let bob = app.create_user("Bob").await;

    let first = app.send_ok(&alice.token, &json!({ "content": "hello", "receiverId": bob.id })).await;
    let conversation_id = first["conversationId"].as_str().unwrap().to_string();

    let mut conversation_rx = app.hub.subscribe(&format!("conversation-{conversation_id}"));
    let mut bob_rx = app.hub.subscribe(&format!("user-{}", bob.id));

    let sent = app.send_ok(&alice.token, &json!({ "content": "are you there?", "conversationId": conversation_id })).await;

    let event = common::next_event(&mut conversation_rx).await;
    assert_eq!(event["topic"], format!("conversation-{conversation_id}"));
    assert_eq!(event["event"], "new-message");
    assert_eq!(event["payload"], sent);
    assert_eq!(event["payload"]["conversationId"], conversation_id);

    let event = common::next_event(&mut bob_rx).await;
    assert_eq!(event["topic"], format!("user-{}", bob.id));
    assert_eq!(event["event"], "new-notification");
    let payload = &event["payload"];
    assert_eq!(payload["type"], "message");
    assert_eq!(payload["title"], "New message from Alice");
    assert_eq!(payload["message"], "are you there?");
    assert_eq!(payload["read"], false);
    assert_eq!(payload["data"]["messageId"], sent["id"]);
    assert_eq!(payload["data"]["listingTitle"], "Unknown Property");

    // The pushed id is minted at publish time, not taken from the stored row
    let stored_ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM notifications WHERE user_id = $1")
        .bind(bob.id)
        .fetch_all(&app.pool)
        .await
        .unwrap();
    let pushed_id = payload["id"].as_str().unwrap();
    assert!(pushed_id.parse::<u64>().is_ok());
    assert!(stored_ids.iter().all(|id| id.to_string() != pushed_id));
}

#[tokio::test]
async fn test_gateway_streams_events_to_participants() {
    let Some(app) = common::TestApp::spawn().await else { return };
    let alice = app.create_user("Alice").await;
    let bob = app.create_user("Bob").await;

    let first = app.send_ok(&alice.token, &json!({ "content": "hello", "receiverId": bob.id })).await;
    let conversation_id: Uuid = first["conversationId"].as_str().unwrap().parse().unwrap();

    let mut client = app.connect_ws(&bob.token, Some(conversation_id)).await;
    app.wait_for_subscribers(&format!("conversation-{conversation_id}"), 1).await;
    app.wait_for_subscribers(&format!("user-{}", bob.id), 1).await;

    let sent = app.send_ok(&alice.token, &json!({ "content": "ping", "conversationId": conversation_id })).await;

    let mut seen = HashSet::new();
    for _ in 0..2 {
        let event = client.receive_event().await.expect("Expected realtime event");
        let kind = event["event"].as_str().unwrap().to_string();
        if kind == "new-message" {
            assert_eq!(event["payload"]["id"], sent["id"]);
        } else {
            assert_eq!(event["payload"]["data"]["messageId"], sent["id"]);
        }
        seen.insert(kind);
    }

    assert!(seen.contains("new-message"));
    assert!(seen.contains("new-notification"));
}

#[tokio::test]
async fn test_gateway_refuses_conversation_of_non_participant() {
    let Some(app) = common::TestApp::spawn().await else { return };
    let alice = app.create_user("Alice").await;
    let bob = app.create_user("Bob").await;
    let eve = app.create_user("Eve").await;

    let first = app.send_ok(&alice.token, &json!({ "content": "secret", "receiverId": bob.id })).await;
    let conversation_id: Uuid = first["conversationId"].as_str().unwrap().parse().unwrap();

    let _client = app.connect_ws(&eve.token, Some(conversation_id)).await;
    app.wait_for_subscribers(&format!("user-{}", eve.id), 1).await;

    assert_eq!(app.hub.subscriber_count(&format!("conversation-{conversation_id}")), 0);
}

#[tokio::test]
async fn test_gateway_rejects_invalid_token() {
    let Some(app) = common::TestApp::spawn().await else { return };

    let url = format!("{}/v1/gateway?token=garbage", app.ws_url);
    assert!(tokio_tungstenite::connect_async(url).await.is_err());
}

#[tokio::test]
async fn test_concurrent_first_messages_share_one_conversation() {
    let Some(app) = common::TestApp::spawn().await else { return };
    let alice = app.create_user("Alice").await;
    let bob = app.create_user("Bob").await;

    let requests: Vec<_> = (0..8)
        .map(|i| {
            let (sender, receiver) = if i % 2 == 0 { (&alice, bob.id) } else { (&bob, alice.id) };
            (sender.token.as_str(), json!({ "content": format!("race {i}"), "receiverId": receiver }))
        })
        .collect();

    let sends = requests.iter().map(|(token, body)| app.send_message(token, body));
    let responses = futures::future::join_all(sends).await;
    let mut conversation_ids = HashSet::new();
    for resp in responses {
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        conversation_ids.insert(body["conversationId"].as_str().unwrap().to_string());
    }

    assert_eq!(conversation_ids.len(), 1);
    assert_eq!(app.conversation_count_for(alice.id).await, 1);
}

#[tokio::test]
async fn test_sending_works_with_realtime_disabled() {
    let Some(mut config) = common::get_test_config() else { return };
    config.realtime.backend = RealtimeBackend::None;
    let app = common::TestApp::spawn_with_config(config).await;
    let alice = app.create_user("Alice").await;
    let bob = app.create_user("Bob").await;

    app.send_ok(&alice.token, &json!({ "content": "quiet", "receiverId": bob.id })).await;
    assert_eq!(app.notification_count_for(bob.id).await, 1);
}

#[tokio::test]
async fn test_unreachable_redis_disables_realtime_without_failing_requests() {
    let Some(mut config) = common::get_test_config() else { return };
    config.realtime.backend = RealtimeBackend::Redis;
    config.realtime.redis_url = Some("redis://127.0.0.1:1".to_string());

    let app = common::TestApp::spawn_with_config(config).await;
    let alice = app.create_user("Alice").await;
    let bob = app.create_user("Bob").await;

    app.send_ok(&alice.token, &json!({ "content": "still works", "receiverId": bob.id })).await;
    assert_eq!(app.notification_count_for(bob.id).await, 1);

    let resp = app.client.get(format!("{}/readyz", app.mgmt_url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["realtime"], "ok");
}

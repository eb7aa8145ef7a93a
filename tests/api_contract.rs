//! HTTP contract tests for the chat API transport.
//!
//! These run the real `reqwest` client against a `wiremock` server and check
//! both request payload shapes, the status handling, and the full turn flow.

use lingxi_chat::api_client::{ApiClient, ChatTransport};
use lingxi_chat::config::{ChatArgs, ChatConfig, PayloadShape};
use lingxi_chat::conversation::{Conversation, Message, Mode, ReplySource, TurnOutcome};
use lingxi_chat::error::ChatError;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer, payload: PayloadShape) -> ChatConfig {
    ChatConfig::from_args(ChatArgs {
        api_url: format!("{}/chat", server.uri()),
        api_key: Some("test-key".to_string()),
        model: "gpt-3.5-turbo".to_string(),
        temperature: 0.7,
        max_tokens: 1000,
        payload: Some(payload),
        user_id: Some("user-123".to_string()),
        timeout_secs: 1,
        mode: "assistant".to_string(),
        voice_command: None,
        trust_images: false,
        html: false,
    })
    .unwrap()
}

// ────────────────────────────────────────────────────────────────────────────
// Request format
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_payload_carries_messages_and_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "messages": [{"role": "user", "content": "Hello"}],
            "model": "gpt-3.5-turbo",
            "temperature": 0.7,
            "max_tokens": 1000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "Hi"}}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&config(&mock_server, PayloadShape::History)).unwrap();
    let body = client.send(Mode::Assistant, &[Message::user("Hello")]).await.unwrap();

    assert_eq!(body["choices"][0]["message"]["content"], "Hi");
}

#[tokio::test]
async fn single_turn_payload_sends_last_message_without_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat"))
        .and(body_partial_json(json!({
            "user_input": "second",
            "user_unique_id": "user-123"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "data": {"output": "ok"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&config(&mock_server, PayloadShape::SingleTurn)).unwrap();
    let history = [
        Message::user("first"),
        Message::assistant("reply"),
        Message::user("second"),
    ];
    client.send(Mode::Assistant, &history).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(sent.get("messages").is_none());
}

// ────────────────────────────────────────────────────────────────────────────
// Response handling
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_success_status_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&config(&mock_server, PayloadShape::History)).unwrap();
    let err = client.send(Mode::Assistant, &[Message::user("Hello")]).await.unwrap_err();

    match err {
        ChatError::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn plain_text_body_is_a_bare_string() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("just words"))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&config(&mock_server, PayloadShape::History)).unwrap();
    let body = client.send(Mode::Assistant, &[Message::user("Hello")]).await.unwrap();

    assert_eq!(body, Value::String("just words".to_string()));
}

#[tokio::test]
async fn slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&config(&mock_server, PayloadShape::History)).unwrap();
    let err = client.send(Mode::Assistant, &[Message::user("Hello")]).await.unwrap_err();

    assert!(matches!(err, ChatError::Transport(_)));
    assert!(err.is_transport_failure());
}

// ────────────────────────────────────────────────────────────────────────────
// Full turns
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn conversation_round_trip_through_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"reply": "See {#image#https://cdn.example.com/a.png}"}
        })))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&config(&mock_server, PayloadShape::History)).unwrap();
    let conversation = Conversation::new(client, Mode::Assistant);

    let outcome = conversation.submit_turn("show me").await.unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::Replied {
            reply: "See {#image#https://cdn.example.com/a.png}".to_string(),
            source: ReplySource::Remote,
        }
    );

    conversation.submit_turn("again").await.unwrap();
    let requests = mock_server.received_requests().await.unwrap();
    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["messages"].as_array().unwrap().len(), 3);
    assert_eq!(second["messages"][1]["role"], "assistant");
}

#[tokio::test]
async fn switching_mode_changes_the_request_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "ok"})))
        .mount(&mock_server)
        .await;

    let mut args = config(&mock_server, PayloadShape::History);
    args.payload = None;
    let client = ApiClient::new(&args).unwrap();
    let conversation = Conversation::new(client, Mode::Assistant);

    conversation.submit_turn("first").await.unwrap();
    conversation.switch_mode(Mode::Sales).unwrap();
    conversation.submit_turn("second").await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let assistant: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let sales: Value = serde_json::from_slice(&requests[1].body).unwrap();

    assert_eq!(assistant["messages"][0]["content"], "first");
    assert!(assistant.get("user_input").is_none());
    assert!(requests[0].headers.get("authorization").is_some());

    assert_eq!(sales["user_input"], "second");
    assert_eq!(sales["user_unique_id"], "user-123");
    assert!(sales.get("messages").is_none());
    assert!(requests[1].headers.get("authorization").is_none());
}

#[tokio::test]
async fn payload_override_applies_to_the_starting_mode_only() {
    let mock_server = MockServer::start().await;
    let client = ApiClient::new(&config(&mock_server, PayloadShape::SingleTurn)).unwrap();
    let history = [Message::user("Hello")];

    let assistant = client.request_body(Mode::Assistant, &history);
    assert_eq!(assistant["user_input"], "Hello");
    let sales = client.request_body(Mode::Sales, &history);
    assert_eq!(sales["user_input"], "Hello");

    let mut args = config(&mock_server, PayloadShape::History);
    args.mode = Mode::Sales;
    let client = ApiClient::new(&args).unwrap();
    assert!(client.request_body(Mode::Sales, &history).get("messages").is_some());
    assert!(client.request_body(Mode::Assistant, &history).get("messages").is_some());
}

#[tokio::test]
async fn loopback_outage_is_answered_locally() {
    // MockServer listens on 127.0.0.1, so the endpoint counts as local.
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(&config(&mock_server, PayloadShape::History)).unwrap();
    assert!(client.is_loopback());
    let conversation = Conversation::new(client, Mode::Assistant);

    let outcome = conversation.submit_turn("hello").await.unwrap();
    assert!(matches!(
        outcome,
        TurnOutcome::Replied {
            source: ReplySource::Canned,
            ..
        }
    ));
    assert_eq!(conversation.history().len(), 2);
}

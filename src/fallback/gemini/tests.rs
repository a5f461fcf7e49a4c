use super::*;
use crate::config::GeminiConfig;
use std::io::Cursor;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{header, method, path, query_param},
};

const STREAM_PATH: &str = "/v1beta/models/test-model:streamGenerateContent";

fn sse(chunks: &[&str]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("data: {}\r\n\r\n", chunk))
        .collect()
}

fn text_chunk(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
    })
    .to_string()
}

fn final_chunk(text: &str, reason: &str) -> String {
    serde_json::json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": reason
        }]
    })
    .to_string()
}

fn fragments(body: &str) -> Vec<Result<String, UpstreamError>> {
    SseFragments::new(Cursor::new(body.to_string())).collect()
}

fn test_client(endpoint: &str) -> GeminiClient {
    let config = GeminiConfig {
        endpoint: endpoint.to_string(),
        model: "test-model".to_string(),
        ..GeminiConfig::default()
    };
    GeminiClient::new(&config, ApiKey::new("test-key").expect("key"))
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(5))
}

async fn collect_reply(
    client: GeminiClient,
    history: Conversation,
    query: &'static str,
) -> Result<Vec<String>, UpstreamError> {
    tokio::task::spawn_blocking(move || -> Result<Vec<String>, UpstreamError> {
        client.send(&history, query)?.collect()
    })
        .await
        .expect("blocking task should not panic")
}

#[test]
fn client_configuration() {
    let client = test_client("http://test-host:1234");

    assert_eq!(client.model(), "test-model");
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
    assert_eq!(
        client.stream_url().expect("url").as_str(),
        "http://test-host:1234/v1beta/models/test-model:streamGenerateContent?alt=sse"
    );
}

#[test]
fn request_includes_history_then_query() {
    let mut history = Conversation::new();
    history.record_exchange("What is diabetes?", "A metabolic disease.");

    let request = GenerateRequest::new(&history, "Is it curable?");
    let json = serde_json::to_value(&request).expect("serialize");

    assert_eq!(
        json,
        serde_json::json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "What is diabetes?" }] },
                { "role": "model", "parts": [{ "text": "A metabolic disease." }] },
                { "role": "user", "parts": [{ "text": "Is it curable?" }] }
            ]
        })
    );
}

#[test]
fn sse_yields_fragments_in_order() {
    let body = sse(&[
        &text_chunk("Diabetes is "),
        &text_chunk("a chronic "),
        &final_chunk("condition.", "STOP"),
    ]);

    let texts: Vec<String> = fragments(&body)
        .into_iter()
        .collect::<Result<_, _>>()
        .expect("complete stream");
    assert_eq!(texts, vec!["Diabetes is ", "a chronic ", "condition."]);
}

#[test]
fn sse_ignores_comments_and_blank_lines() {
    let body = format!(
        ": keep-alive\n\nevent: message\ndata: {}\n\ndata:\n\n",
        final_chunk("Hello", "STOP")
    );

    let texts: Vec<String> = fragments(&body)
        .into_iter()
        .collect::<Result<_, _>>()
        .expect("complete stream");
    assert_eq!(texts, vec!["Hello"]);
}

#[test]
fn sse_without_finish_reason_is_truncated() {
    let body = sse(&[&text_chunk("partial")]);
    let results = fragments(&body);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_deref().ok(), Some("partial"));
    assert!(matches!(results[1], Err(UpstreamError::Truncated)));
}

#[test]
fn sse_safety_stop_is_an_error_after_text() {
    let body = sse(&[&final_chunk("I can", "SAFETY")]);
    let results = fragments(&body);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_deref().ok(), Some("I can"));
    assert!(matches!(results[1], Err(UpstreamError::Blocked(ref r)) if r == "SAFETY"));
}

#[test]
fn sse_blocked_prompt_is_an_error() {
    let body = sse(&[r#"{"promptFeedback":{"blockReason":"OTHER"}}"#]);
    let results = fragments(&body);

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(UpstreamError::Blocked(ref r)) if r == "OTHER"));
}

#[test]
fn sse_error_chunk_is_an_error() {
    let body = sse(&[
        &text_chunk("Start"),
        r#"{"error":{"code":500,"message":"Internal error","status":"INTERNAL"}}"#,
    ]);
    let results = fragments(&body);

    assert_eq!(results.len(), 2);
    assert!(matches!(results[1], Err(UpstreamError::Service(ref m)) if m == "Internal error"));
}

#[test]
fn sse_malformed_chunk_is_an_error() {
    let results = fragments("data: {not json}\n\n");

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(UpstreamError::Decode(_))));
}

#[test]
fn sse_stream_is_not_restartable() {
    let body = sse(&[&final_chunk("once", "STOP")]);
    let mut stream = SseFragments::new(Cursor::new(body));

    assert!(matches!(stream.next(), Some(Ok(_))));
    assert!(stream.next().is_none());
    assert!(stream.next().is_none());
}

#[test]
fn error_message_prefers_json_message() {
    assert_eq!(
        error_message(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#),
        Some("API key not valid".to_string())
    );
    assert_eq!(error_message("plain failure"), Some("plain failure".to_string()));
    assert_eq!(error_message("  "), None);
}

#[tokio::test]
async fn streams_reply_from_server() {
    let server = MockServer::start().await;
    let body = sse(&[&text_chunk("Diabetes is "), &final_chunk("a metabolic disease.", "STOP")]);

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let reply = collect_reply(test_client(&server.uri()), Conversation::new(), "What is diabetes?")
        .await
        .expect("reply should stream");

    assert_eq!(reply, vec!["Diabetes is ", "a metabolic disease."]);
}

#[tokio::test]
async fn sends_conversation_history() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse(&[&final_chunk("Yes.", "STOP")]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let mut history = Conversation::new();
    history.record_exchange("What is asthma?", "A lung condition.");

    collect_reply(test_client(&server.uri()), history, "Is it common?")
        .await
        .expect("reply should stream");

    let requests = server
        .received_requests()
        .await
        .expect("request recording is enabled");
    assert_eq!(requests.len(), 1);

    let sent: serde_json::Value =
        serde_json::from_slice(&requests[0].body).expect("request body is JSON");
    let contents = sent["contents"].as_array().expect("contents array");
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[2]["role"], "user");
    assert_eq!(contents[2]["parts"][0]["text"], "Is it common?");
}

#[tokio::test]
async fn http_error_carries_service_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_raw(
            r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let err = collect_reply(test_client(&server.uri()), Conversation::new(), "hello")
        .await
        .expect_err("request should be rejected");

    assert!(matches!(
        err,
        UpstreamError::Status { code: 400, ref message } if message == "API key not valid"
    ));
}

#[tokio::test]
async fn server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = collect_reply(test_client(&server.uri()), Conversation::new(), "hello")
        .await
        .expect_err("request should fail");

    assert!(matches!(err, UpstreamError::Status { code: 503, .. }));
}

#[tokio::test]
async fn slow_server_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = test_client(&server.uri()).with_timeout(Duration::from_millis(200));
    let err = collect_reply(client, Conversation::new(), "hello")
        .await
        .expect_err("request should time out");

    assert!(matches!(err, UpstreamError::Timeout));
}

//! Integration tests for the chat-completion transport flavor

mod common;

use common::MockUpstream;
use deepsearch_mcp::config::{ProtocolFlavor, TransportSettings};
use deepsearch_mcp::search::{SearchOptions, SearchQuery, ToolIdentity};
use deepsearch_mcp::transport::{HttpTransport, SearchTransport, TransportErrorKind};
use serde_json::json;
use std::time::{Duration, Instant};

fn query() -> SearchQuery {
    SearchQuery::new("rust async runtimes", &SearchOptions::default().top_k(2)).unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 11, "completion_tokens": 22 }
    })
}

#[tokio::test]
async fn test_chat_request_shape() {
    let upstream = MockUpstream::json(completion(
        r#"{"items":[{"title":"Tokio","snippet":"runtime","url":"https://tokio.rs","score":0.9}],"metadata":{"source":"chat"}}"#,
    ))
    .await;
    let transport = HttpTransport::new(upstream.config(ProtocolFlavor::ChatCompletion)).unwrap();

    let payload = transport.invoke(ToolIdentity::General, &query()).await.unwrap();

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path_and_query, "/v1/chat/completions");
    assert_eq!(request.header("authorization"), Some("Bearer test-key"));
    assert_eq!(request.body["model"], "test-model");
    assert_eq!(request.body["stream"], false);
    assert_eq!(request.body["response_format"]["type"], "json_object");
    assert_eq!(
        request.body["tool_choice"]["function"]["name"],
        "format_deepsearch_response"
    );

    let user: serde_json::Value =
        serde_json::from_str(request.body["messages"][1]["content"].as_str().unwrap()).unwrap();
    assert_eq!(user["query"], "rust async runtimes");
    assert_eq!(user["top_k"], 2);
    assert_eq!(user["locale"], "zh-CN");

    assert_eq!(payload.items.len(), 1);
    assert_eq!(payload.metadata["source"], "chat");
    // no usage in the content, so the envelope's counts are used
    assert_eq!(payload.usage["input_tokens"], 11);
    assert_eq!(payload.usage["output_tokens"], 22);
}

#[tokio::test]
async fn test_chat_tool_call_arguments_fallback() {
    let upstream = MockUpstream::json(json!({
        "choices": [{
            "message": {
                "content": null,
                "tool_calls": [{
                    "type": "function",
                    "function": {
                        "name": "format_deepsearch_response",
                        "arguments": "{\"items\":[{\"title\":\"a\",\"url\":\"https://a.example\"}]}"
                    }
                }]
            }
        }]
    }))
    .await;
    let transport = HttpTransport::new(upstream.config(ProtocolFlavor::ChatCompletion)).unwrap();

    let payload = transport.invoke(ToolIdentity::General, &query()).await.unwrap();

    assert_eq!(payload.items.len(), 1);
    assert_eq!(payload.usage["input_tokens"], 0);
}

#[tokio::test]
async fn test_chat_upstream_status() {
    let upstream = MockUpstream::start(500, r#"{"error":"boom"}"#).await;
    let transport = HttpTransport::new(upstream.config(ProtocolFlavor::ChatCompletion)).unwrap();

    let err = transport
        .invoke(ToolIdentity::General, &query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::UpstreamStatus);
    assert_eq!(err.status(), Some(500));
    assert_eq!(upstream.requests().len(), 1);
}

#[tokio::test]
async fn test_chat_content_not_json() {
    let upstream = MockUpstream::json(completion("Sorry, I cannot help with that.")).await;
    let transport = HttpTransport::new(upstream.config(ProtocolFlavor::ChatCompletion)).unwrap();

    let err = transport
        .invoke(ToolIdentity::General, &query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::InvalidJson);
}

#[tokio::test]
async fn test_chat_envelope_not_json() {
    let upstream = MockUpstream::start(200, "<html>gateway</html>").await;
    let transport = HttpTransport::new(upstream.config(ProtocolFlavor::ChatCompletion)).unwrap();

    let err = transport
        .invoke(ToolIdentity::General, &query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::InvalidJson);
}

#[tokio::test]
async fn test_chat_missing_choices() {
    let upstream = MockUpstream::json(json!({ "choices": [] })).await;
    let transport = HttpTransport::new(upstream.config(ProtocolFlavor::ChatCompletion)).unwrap();

    let err = transport
        .invoke(ToolIdentity::General, &query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::EmptyResponse);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let config = TransportSettings::new("test-key")
        .base_url("http://127.0.0.1:1")
        .timeout_secs(5.0)
        .protocol(ProtocolFlavor::ChatCompletion)
        .resolve_explicit()
        .unwrap();
    let transport = HttpTransport::new(config).unwrap();

    let err = transport
        .invoke(ToolIdentity::General, &query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::Network);
    assert!(!err.to_string().contains("test-key"));
}

#[tokio::test]
async fn test_error_status_with_stalled_body_keeps_status() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Announces a 1000 byte body, sends a few bytes, then stalls
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4096];
        let _ = socket.read(&mut buf).await;
        let head = "HTTP/1.1 500 Internal Server Error\r\nContent-Type: application/json\r\nContent-Length: 1000\r\n\r\n{\"err";
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    let config = TransportSettings::new("test-key")
        .base_url(format!("http://{addr}"))
        .timeout_secs(0.5)
        .protocol(ProtocolFlavor::ChatCompletion)
        .resolve_explicit()
        .unwrap();
    let transport = HttpTransport::new(config).unwrap();

    let started = Instant::now();
    let err = transport
        .invoke(ToolIdentity::General, &query())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), TransportErrorKind::UpstreamStatus);
    assert_eq!(err.status(), Some(500));
    assert!(started.elapsed() < Duration::from_secs(5));
}

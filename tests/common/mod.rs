//! Common test utilities: an in-process upstream server and a recording transport

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use deepsearch_mcp::config::{ProtocolFlavor, TransportConfig, TransportSettings};
use deepsearch_mcp::search::{SearchQuery, SearchResultPayload, ToolIdentity};
use deepsearch_mcp::transport::{SearchTransport, TransportError};
use serde_json::Value;

/// One request as seen by [`MockUpstream`]
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: Method,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Value,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Local HTTP server answering every request with a canned response
pub struct MockUpstream {
    pub base_url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockUpstream {
    pub async fn start(status: u16, body: impl Into<String>) -> Self {
        Self::start_with_delay(status, body, None).await
    }

    pub async fn json(body: Value) -> Self {
        Self::start(200, body.to_string()).await
    }

    pub async fn start_with_delay(
        status: u16,
        body: impl Into<String>,
        delay: Option<Duration>,
    ) -> Self {
        let captured: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let reply: String = body.into();
        let status = StatusCode::from_u16(status).expect("valid status");

        let state = captured.clone();
        // fallback: `:generateContent` paths don't fit axum's route syntax
        let app = Router::new().fallback(
            move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
                let state = state.clone();
                let reply = reply.clone();
                async move {
                    let path_and_query = uri
                        .path_and_query()
                        .map(|pq| pq.as_str().to_string())
                        .unwrap_or_default();
                    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
                    state.lock().unwrap().push(CapturedRequest {
                        method,
                        path_and_query,
                        headers,
                        body,
                    });
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    (status, [(header::CONTENT_TYPE, "application/json")], reply)
                }
            },
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            captured,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }

    /// Explicit settings pointing at this server, no environment involved
    pub fn config(&self, protocol: ProtocolFlavor) -> TransportConfig {
        TransportSettings::new("test-key")
            .base_url(self.base_url.clone())
            .model("test-model")
            .timeout_secs(5.0)
            .protocol(protocol)
            .resolve_explicit()
            .unwrap()
    }
}

/// Canned answer for [`RecordingTransport`]
#[derive(Debug, Clone)]
pub enum Reply {
    Payload(SearchResultPayload),
    Status(u16),
}

/// Transport double that records every invocation
pub struct RecordingTransport {
    reply: Reply,
    calls: Mutex<Vec<(ToolIdentity, SearchQuery)>>,
    closes: AtomicUsize,
}

impl RecordingTransport {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        })
    }

    pub fn returning(payload: SearchResultPayload) -> Arc<Self> {
        Self::new(Reply::Payload(payload))
    }

    pub fn calls(&self) -> Vec<(ToolIdentity, SearchQuery)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SearchTransport for RecordingTransport {
    async fn invoke(
        &self,
        tool: ToolIdentity,
        query: &SearchQuery,
    ) -> Result<SearchResultPayload, TransportError> {
        self.calls.lock().unwrap().push((tool, query.clone()));
        match &self.reply {
            Reply::Payload(payload) => Ok(payload.clone()),
            Reply::Status(status) => Err(TransportError::UpstreamStatus { status: *status }),
        }
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

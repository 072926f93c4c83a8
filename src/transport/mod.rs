pub mod chat;
pub mod generative;
pub mod recovery;

pub use recovery::RecoveryError;

use crate::config::{ConfigError, ProtocolFlavor, TransportConfig};
use crate::search::{SearchQuery, SearchResultPayload, ToolIdentity};
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::Instrument;
use url::Url;

/// Transport abstraction - one upstream call per invocation, no retries
#[async_trait::async_trait]
pub trait SearchTransport: Send + Sync {
    /// Run `query` as `tool` against the upstream and return the raw payload
    async fn invoke(
        &self,
        tool: ToolIdentity,
        query: &SearchQuery,
    ) -> Result<SearchResultPayload, TransportError>;

    /// Release held resources. Stateless transports have nothing to do.
    fn close(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    UpstreamStatus,
    Network,
    EmptyResponse,
    InvalidJson,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::UpstreamStatus => "upstream-status",
            TransportErrorKind::Network => "network",
            TransportErrorKind::EmptyResponse => "empty-response",
            TransportErrorKind::InvalidJson => "invalid-json",
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures after a network attempt was made
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("upstream request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("upstream returned HTTP {status}")]
    UpstreamStatus { status: u16 },

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("upstream response has no usable content: {0}")]
    EmptyResponse(&'static str),

    #[error("upstream content is not valid JSON")]
    InvalidJson(#[source] RecoveryError),
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            TransportError::Timeout { .. } => TransportErrorKind::Timeout,
            TransportError::UpstreamStatus { .. } => TransportErrorKind::UpstreamStatus,
            TransportError::Network(_) => TransportErrorKind::Network,
            TransportError::EmptyResponse(_) => TransportErrorKind::EmptyResponse,
            TransportError::InvalidJson(_) => TransportErrorKind::InvalidJson,
        }
    }

    /// HTTP status for `UpstreamStatus`, `None` otherwise
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::UpstreamStatus { status } => Some(*status),
            _ => None,
        }
    }
}

/// HTTP transport for either protocol flavor.
///
/// The flavor is fixed at construction from [`TransportConfig::protocol`].
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let endpoint = match config.protocol() {
            ProtocolFlavor::ChatCompletion => chat::endpoint(&config)?,
            ProtocolFlavor::GenerativeSearch => generative::endpoint(&config)?,
        };

        let client = reqwest::Client::builder()
            .build()
            .map_err(ConfigError::HttpClient)?;

        tracing::info!(
            protocol = %config.protocol(),
            base_url = %config.base_url(),
            model = %config.model(),
            timeout_ms = config.timeout_ms(),
            "deepsearch transport initialized"
        );

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Resolve configuration from the environment and build a transport
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(TransportConfig::from_env()?)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn protocol(&self) -> ProtocolFlavor {
        self.config.protocol()
    }

    /// Full request URL. For the generative flavor this embeds the API key.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST `body` and decode the JSON envelope, bounded by the configured timeout.
    ///
    /// The deadline covers sending, the response head and the success body. On
    /// expiry the in-flight exchange is dropped, which aborts the request.
    ///
    /// A non-2xx status is final as soon as the head arrives; its body is only
    /// read for the log line, under [`read_error_body`]'s own bounds.
    async fn post_json(&self, body: &Value) -> Result<Value, TransportError> {
        let timeout_ms = self.config.timeout_ms();
        let deadline = tokio::time::Instant::now() + self.config.timeout();
        let classify = |err: reqwest::Error| {
            if err.is_timeout() {
                TransportError::Timeout { timeout_ms }
            } else {
                TransportError::Network(err.without_url())
            }
        };
        let timed_out = || {
            tracing::warn!(timeout_ms, "deepsearch upstream request timed out, aborted");
            TransportError::Timeout { timeout_ms }
        };

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(body);
        if self.config.protocol() == ProtocolFlavor::ChatCompletion {
            request = request.bearer_auth(self.config.api_key());
        }

        let response = tokio::time::timeout_at(deadline, request.send())
            .await
            .map_err(|_| timed_out())?
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = read_error_body(response).await;
            tracing::warn!(
                status = %status,
                error = %crate::logging::redact_secrets(&error_text),
                "deepsearch upstream returned error status"
            );
            return Err(TransportError::UpstreamStatus {
                status: status.as_u16(),
            });
        }

        let text = tokio::time::timeout_at(deadline, response.text())
            .await
            .map_err(|_| timed_out())?
            .map_err(classify)?;
        serde_json::from_str::<Value>(&text)
            .map_err(|e| TransportError::InvalidJson(RecoveryError::Parse(e)))
    }
}

/// Most bytes of an error body kept for logging
const ERROR_BODY_LIMIT: usize = 4 * 1024;
/// How long an error body may take to arrive
const ERROR_BODY_TIMEOUT: Duration = Duration::from_secs(1);

/// Best-effort read of an error response body. Stops at [`ERROR_BODY_LIMIT`]
/// bytes, after [`ERROR_BODY_TIMEOUT`], or on the first read error, and
/// returns whatever arrived until then.
async fn read_error_body(mut response: reqwest::Response) -> String {
    let mut buf: Vec<u8> = Vec::new();
    let read = async {
        while buf.len() < ERROR_BODY_LIMIT {
            match response.chunk().await {
                Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e.without_url(), "failed to read error body");
                    break;
                }
            }
        }
    };
    if tokio::time::timeout(ERROR_BODY_TIMEOUT, read).await.is_err() {
        tracing::debug!("error body read timed out, logging partial body");
    }
    buf.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&buf).into_owned()
}

#[async_trait::async_trait]
impl SearchTransport for HttpTransport {
    async fn invoke(
        &self,
        tool: ToolIdentity,
        query: &SearchQuery,
    ) -> Result<SearchResultPayload, TransportError> {
        let protocol = self.config.protocol();
        let span = tracing::info_span!(
            "transport",
            protocol = %protocol,
            model = %self.config.model()
        );

        async move {
            let started = Instant::now();
            let body = match protocol {
                ProtocolFlavor::ChatCompletion => {
                    chat::build_request(self.config.model(), tool, query)
                }
                ProtocolFlavor::GenerativeSearch => generative::build_request(tool, query),
            };

            tracing::debug!(
                tool = %tool,
                query = %query.query(),
                top_k = query.top_k(),
                "sending deepsearch request"
            );

            let result = match self.post_json(&body).await {
                Ok(data) => match protocol {
                    ProtocolFlavor::ChatCompletion => chat::parse_response(&data),
                    ProtocolFlavor::GenerativeSearch => generative::parse_response(&data),
                },
                Err(e) => Err(e),
            };

            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(payload) => tracing::info!(
                    items = payload.items.len(),
                    elapsed_ms,
                    "deepsearch request completed"
                ),
                Err(e) => tracing::warn!(
                    kind = %e.kind(),
                    error = %e,
                    elapsed_ms,
                    "deepsearch request failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn close(&self) {
        tracing::debug!("deepsearch transport closed");
    }
}

/// Split a parsed model object into the raw payload.
///
/// `fallback_usage` runs only when the object carries no non-empty `usage`.
pub(crate) fn shape_payload<F>(mut parsed: Map<String, Value>, fallback_usage: F) -> SearchResultPayload
where
    F: FnOnce() -> Map<String, Value>,
{
    let items = match parsed.remove("items") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    let metadata = match parsed.remove("metadata") {
        Some(Value::Object(metadata)) => metadata,
        _ => Map::new(),
    };
    let usage = match parsed.remove("usage") {
        Some(Value::Object(usage)) if !usage.is_empty() => usage,
        _ => fallback_usage(),
    };

    SearchResultPayload {
        items,
        metadata,
        usage,
    }
}

/// `{"input_tokens": .., "output_tokens": ..}` with absent counts as zero
pub(crate) fn usage_map(input: Option<&Value>, output: Option<&Value>) -> Map<String, Value> {
    let mut usage = Map::new();
    usage.insert(
        "input_tokens".to_string(),
        input.cloned().unwrap_or_else(|| Value::from(0)),
    );
    usage.insert(
        "output_tokens".to_string(),
        output.cloned().unwrap_or_else(|| Value::from(0)),
    );
    usage
}

pub(crate) fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

pub(crate) fn join_endpoint(config: &TransportConfig, path: &str) -> Result<Url, ConfigError> {
    let raw = format!("{}{}", config.base_url(), path);
    Url::parse(&raw).map_err(|source| ConfigError::InvalidBaseUrl {
        value: config.base_url().to_string(),
        source,
    })
}

//! MCP server exposing the `deepsearch` and `deepsearch-web` tools.
//!
//! Every tool call runs inside its own `tool_call` span tagged with the tool
//! name and a fresh request id. Failures never escape as protocol errors: they
//! come back as an `isError` result carrying `{"error": {"kind", "message"}}`.

use std::sync::Arc;
use std::time::Instant;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::tool::schema_for_type;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde_json::{json, Value};
use tracing::Instrument;
use uuid::Uuid;

use crate::agent::{DeepSearchAgent, DeepSearchWebAgent, SearchAgent};
use crate::config::{ConfigError, TransportConfig};
use crate::error::{SearchError, ValidationError};
use crate::search::SearchResult;

use super::params::{DeepSearchParams, DeepSearchWebParams, MAX_TOP_K};

/// DeepSearch MCP server.
///
/// Agents built by [`from_config`](Self::from_config) are managed and get
/// closed by [`shutdown`](Self::shutdown); agents handed to [`new`](Self::new)
/// belong to the caller.
#[derive(Clone)]
pub struct DeepSearchServer {
    tool_router: ToolRouter<Self>,
    general: Arc<dyn SearchAgent>,
    web: Arc<dyn SearchAgent>,
    managed: Vec<Arc<dyn SearchAgent>>,
}

#[tool_router]
impl DeepSearchServer {
    #[tool(
        name = "deepsearch",
        output_schema = schema_for_type::<SearchResult>(),
        description = "General web search backed by a search-grounded model. Returns JSON with `items` (title, snippet, url, score), `metadata` and token `usage`. Optional `top_k` (1-10, default 5), `locale` (default zh-CN) and free-form `filters`."
    )]
    async fn search_general(
        &self,
        Parameters(params): Parameters<DeepSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&self.general, params).await
    }

    #[tool(
        name = "deepsearch-web",
        output_schema = schema_for_type::<SearchResult>(),
        description = "Site- or time-directed web search. `filters` must contain a non-empty `site` (e.g. \"docs.rs\") or `time_range` (e.g. \"7d\"). Returns the same JSON shape as `deepsearch`."
    )]
    async fn search_web(
        &self,
        Parameters(params): Parameters<DeepSearchWebParams>,
    ) -> Result<CallToolResult, McpError> {
        self.dispatch(&self.web, params.into()).await
    }
}

impl DeepSearchServer {
    /// Serve caller-provided agents. They are never closed by the server.
    pub fn new(general: Arc<dyn SearchAgent>, web: Arc<dyn SearchAgent>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            general,
            web,
            managed: Vec::new(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(TransportConfig::from_env()?)
    }

    /// Build both agents, each with its own transport.
    pub fn from_config(config: TransportConfig) -> Result<Self, ConfigError> {
        let general: Arc<dyn SearchAgent> = Arc::new(DeepSearchAgent::from_config(config.clone())?);
        let web: Arc<dyn SearchAgent> = Arc::new(DeepSearchWebAgent::from_config(config)?);
        let mut server = Self::new(general.clone(), web.clone());
        server.managed = vec![general, web];
        Ok(server)
    }

    /// Close the agents this server created. Safe to call more than once.
    pub fn shutdown(&self) {
        for agent in &self.managed {
            agent.close();
        }
        tracing::info!(closed = self.managed.len(), "deepsearch server shut down");
    }

    async fn dispatch(
        &self,
        agent: &Arc<dyn SearchAgent>,
        params: DeepSearchParams,
    ) -> Result<CallToolResult, McpError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "tool_call",
            tool = agent.tool().tool_name(),
            request_id = %request_id
        );

        async move {
            let started = Instant::now();
            tracing::info!(query = %params.query, top_k = ?params.top_k, "tool call received");

            let outcome = match check_top_k(params.top_k) {
                Ok(()) => agent.search(&params.query, &params.options()).await,
                Err(e) => Err(e.into()),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(result) => {
                    tracing::info!(items = result.items.len(), elapsed_ms, "tool call succeeded");
                    success_result(&result)
                }
                Err(e) => {
                    tracing::warn!(kind = e.kind(), error = %e, elapsed_ms, "tool call failed");
                    Ok(failure_result(&e))
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn check_top_k(top_k: Option<i64>) -> Result<(), ValidationError> {
    match top_k {
        Some(value) if value > MAX_TOP_K => Err(ValidationError::TopKAboveLimit {
            value,
            max: MAX_TOP_K,
        }),
        _ => Ok(()),
    }
}

fn success_result(result: &SearchResult) -> Result<CallToolResult, McpError> {
    let payload = serde_json::to_value(result)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;
    let text = serde_json::to_string_pretty(&payload)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {e}"), None))?;

    let mut r = CallToolResult::structured(payload);
    r.content = vec![Content::text(text)];
    Ok(r)
}

fn failure_result(error: &SearchError) -> CallToolResult {
    CallToolResult::structured_error(error_payload(error))
}

fn error_payload(error: &SearchError) -> Value {
    json!({
        "error": {
            "kind": error.kind(),
            "message": error.to_string(),
        }
    })
}

#[tool_handler]
impl ServerHandler for DeepSearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "deepsearch-mcp".to_string(),
                title: Some("DeepSearch MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "DeepSearch: web search through a search-grounded model. Use `deepsearch` for \
                 open queries and `deepsearch-web` when results must come from a given site \
                 (`filters.site`) or time window (`filters.time_range`)."
                    .to_string(),
            ),
        }
    }
}

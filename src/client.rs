use crate::error::SearchError;
use crate::search::{
    SearchOptions, SearchQuery, SearchResult, SearchResultItem, SearchResultPayload, ToolIdentity,
    Usage,
};
use crate::transport::SearchTransport;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Normalizing client: validates options, calls the transport once, and
/// reshapes the raw payload into a [`SearchResult`].
#[derive(Clone)]
pub struct DeepSearchClient {
    transport: Arc<dyn SearchTransport>,
    tool: ToolIdentity,
}

impl DeepSearchClient {
    pub fn new(transport: Arc<dyn SearchTransport>, tool: ToolIdentity) -> Self {
        Self { transport, tool }
    }

    pub fn tool(&self) -> ToolIdentity {
        self.tool
    }

    pub fn transport(&self) -> &Arc<dyn SearchTransport> {
        &self.transport
    }

    /// Validation happens before the transport is touched: an invalid `top_k`
    /// or blank query never produces a network call.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, SearchError> {
        let query = SearchQuery::new(query, options)?;
        let payload = self.transport.invoke(self.tool, &query).await?;
        Ok(normalize(payload))
    }
}

/// Fill defaults and coerce types. Item order is preserved and nothing is
/// truncated to `top_k`.
pub fn normalize(payload: SearchResultPayload) -> SearchResult {
    let items = payload
        .items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(fields) => Some(normalize_item(&fields)),
            other => {
                tracing::debug!(item = %other, "dropping non-object search result item");
                None
            }
        })
        .collect();

    SearchResult {
        items,
        metadata: payload.metadata,
        usage: Usage {
            input_tokens: coerce_count(payload.usage.get("input_tokens")),
            output_tokens: coerce_count(payload.usage.get("output_tokens")),
        },
    }
}

fn normalize_item(fields: &Map<String, Value>) -> SearchResultItem {
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    SearchResultItem {
        title: text("title"),
        snippet: text("snippet"),
        url: text("url"),
        score: fields.get("score").and_then(Value::as_f64),
    }
}

/// Token counts arrive as integers, floats or numeric strings depending on
/// the upstream. Anything unusable or negative becomes 0.
fn coerce_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f as u64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

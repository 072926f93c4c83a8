use crate::error::ValidationError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const DEFAULT_TOP_K: i64 = 5;
pub const DEFAULT_LOCALE: &str = "zh-CN";

/// Free-form search constraints (e.g. `site`, `time_range`)
pub type Filters = BTreeMap<String, Value>;

/// Which of the two search tools is being invoked.
///
/// Selects the prompt, and for the web-directed tool the filter policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolIdentity {
    General,
    WebDirected,
}

impl ToolIdentity {
    /// Name the tool is registered under at the MCP boundary
    pub fn tool_name(&self) -> &'static str {
        match self {
            ToolIdentity::General => "deepsearch",
            ToolIdentity::WebDirected => "deepsearch-web",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolIdentity::General => "general",
            ToolIdentity::WebDirected => "web-directed",
        }
    }
}

impl std::fmt::Display for ToolIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied options. Everything is optional; defaults are applied by
/// [`SearchQuery::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
}

impl SearchOptions {
    pub fn top_k(mut self, top_k: i64) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters
            .get_or_insert_with(Filters::new)
            .insert(key.into(), value.into());
        self
    }

    /// Returns `filters[key]` when it is a non-blank string.
    pub fn filter_str(&self, key: &str) -> Option<&str> {
        self.filters
            .as_ref()
            .and_then(|f| f.get(key))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Validated, transport-facing query. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchQuery {
    query: String,
    top_k: u64,
    locale: String,
    filters: Filters,
}

impl SearchQuery {
    /// Apply defaults and validate. Fails before any I/O happens.
    pub fn new(query: impl Into<String>, options: &SearchOptions) -> Result<Self, ValidationError> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }

        let top_k = options.top_k.unwrap_or(DEFAULT_TOP_K);
        let top_k = u64::try_from(top_k)
            .ok()
            .filter(|k| *k > 0)
            .ok_or(ValidationError::InvalidTopK(top_k))?;

        Ok(Self {
            query,
            top_k,
            locale: options
                .locale
                .clone()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            filters: options.filters.clone().unwrap_or_default(),
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn top_k(&self) -> u64 {
        self.top_k
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }
}

/// Raw upstream payload, before the client fills in defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResultPayload {
    pub items: Vec<Value>,
    pub metadata: Map<String, Value>,
    pub usage: Map<String, Value>,
}

/// Individual search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResultItem {
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    pub url: String,
    /// Upstream confidence, nominally in `[0, 1]`
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Public result contract returned by both tools.
///
/// `items` keeps upstream relevance order and is never truncated to `top_k`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
    pub items: Vec<SearchResultItem>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub usage: Usage,
}

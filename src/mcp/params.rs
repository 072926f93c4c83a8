//! Input schemas for the two search tools.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::search::SearchOptions;

/// Largest `top_k` accepted at the tool boundary.
pub const MAX_TOP_K: i64 = 10;

/// Parameters for `deepsearch`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeepSearchParams {
    /// Search query. Must not be empty.
    pub query: String,

    /// Number of results to request (1-10, default 5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 10))]
    pub top_k: Option<i64>,

    /// Result language, e.g. `"zh-CN"` or `"en-US"` (default `"zh-CN"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Free-form filters, e.g. `site` or `time_range`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<BTreeMap<String, Value>>,
}

impl DeepSearchParams {
    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            top_k: self.top_k,
            locale: self.locale.clone(),
            filters: self.filters.clone(),
        }
    }
}

/// Parameters for `deepsearch-web`.
///
/// Same fields as [`DeepSearchParams`], except `filters` is required and must
/// carry a non-empty `site` or `time_range` string.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeepSearchWebParams {
    /// Search query. Must not be empty.
    pub query: String,

    /// Number of results to request (1-10, default 5).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 10))]
    pub top_k: Option<i64>,

    /// Result language, e.g. `"zh-CN"` or `"en-US"` (default `"zh-CN"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,

    /// Must contain `site` (e.g. `"docs.rs"`) or `time_range` (e.g. `"7d"`).
    /// Other keys are passed through.
    #[schemars(extend("anyOf" = [
        { "required": ["site"], "properties": { "site": { "type": "string", "minLength": 1 } } },
        { "required": ["time_range"], "properties": { "time_range": { "type": "string", "minLength": 1 } } }
    ]))]
    pub filters: BTreeMap<String, Value>,
}

impl From<DeepSearchWebParams> for DeepSearchParams {
    fn from(params: DeepSearchWebParams) -> Self {
        Self {
            query: params.query,
            top_k: params.top_k,
            locale: params.locale,
            filters: Some(params.filters),
        }
    }
}

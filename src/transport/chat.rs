//! Chat-completion flavor: `POST {base}/v1/chat/completions`.
//!
//! The model is forced to call a single function whose parameter schema is the
//! output contract, so the content comes back as clean JSON and is parsed
//! strictly.

use super::{non_null, recovery, shape_payload, usage_map, TransportError};
use crate::config::{ConfigError, TransportConfig};
use crate::search::{SearchQuery, SearchResultPayload, ToolIdentity};
use serde_json::{json, Value};
use url::Url;

pub const PATH: &str = "/v1/chat/completions";
pub const FUNCTION_NAME: &str = "format_deepsearch_response";

pub fn endpoint(config: &TransportConfig) -> Result<Url, ConfigError> {
    super::join_endpoint(config, PATH)
}

pub fn system_prompt(tool: ToolIdentity) -> &'static str {
    match tool {
        ToolIdentity::General => {
            "You are the DeepSearch general retrieval tool. You must return JSON: \
             `items` is the list of results relevant to the query, `metadata` describes \
             sources and latency, and `usage` reports token counts."
        }
        ToolIdentity::WebDirected => {
            "You are the DeepSearch website-directed retrieval tool. You must return JSON: \
             `items` holds the matching website results and `metadata` contains at least a \
             `source` field. The site/time_range constraints in `filters` must be enforced."
        }
    }
}

/// JSON schema of the forced function. This is the output contract.
pub fn function_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": FUNCTION_NAME,
            "description": "Format the structured DeepSearch response",
            "parameters": {
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "snippet": { "type": "string" },
                                "url": { "type": "string", "format": "uri" },
                                "score": { "type": ["number", "null"] }
                            },
                            "required": ["title", "url"]
                        }
                    },
                    "metadata": { "type": "object" },
                    "usage": {
                        "type": "object",
                        "properties": {
                            "input_tokens": { "type": "integer" },
                            "output_tokens": { "type": "integer" }
                        }
                    }
                },
                "required": ["items"]
            }
        }
    })
}

pub fn build_request(model: &str, tool: ToolIdentity, query: &SearchQuery) -> Value {
    let user_content = json!({
        "query": query.query(),
        "top_k": query.top_k(),
        "locale": query.locale(),
        "filters": query.filters(),
    })
    .to_string();

    json!({
        "model": model,
        "messages": [
            { "role": "system", "content": system_prompt(tool) },
            { "role": "user", "content": user_content }
        ],
        "temperature": 0.1,
        "top_p": 0.9,
        "stream": false,
        "response_format": { "type": "json_object" },
        "tools": [function_schema()],
        "tool_choice": { "type": "function", "function": { "name": FUNCTION_NAME } }
    })
}

/// Extract the first choice's content and shape it into a payload.
///
/// A forced function call may leave `content` empty and carry the JSON in
/// `tool_calls[0].function.arguments` instead; both are accepted.
pub fn parse_response(data: &Value) -> Result<SearchResultPayload, TransportError> {
    let message = data
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .ok_or(TransportError::EmptyResponse("missing choices[0].message"))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
        .or_else(|| {
            message
                .pointer("/tool_calls/0/function/arguments")
                .and_then(Value::as_str)
        })
        .ok_or(TransportError::EmptyResponse(
            "choices[0].message has no string content",
        ))?;

    let parsed = recovery::parse_object(content).map_err(TransportError::InvalidJson)?;

    Ok(shape_payload(parsed, || {
        let usage = data.get("usage");
        usage_map(
            non_null(usage.and_then(|u| u.get("prompt_tokens"))),
            non_null(usage.and_then(|u| u.get("completion_tokens"))),
        )
    }))
}

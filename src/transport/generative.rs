//! Generative-search flavor: `POST {base}/v1beta/models/{model}:generateContent?key={api_key}`.
//!
//! The request declares the search tool but cannot force structured output, so
//! the model text goes through [`recovery::recover_json`].

use super::{non_null, recovery, shape_payload, usage_map, TransportError};
use crate::config::{ConfigError, TransportConfig};
use crate::search::{SearchQuery, SearchResultPayload, ToolIdentity};
use serde_json::{json, Value};
use url::Url;

/// The API key travels in the query string, not a header.
pub fn endpoint(config: &TransportConfig) -> Result<Url, ConfigError> {
    let mut url = super::join_endpoint(
        config,
        &format!("/v1beta/models/{}:generateContent", config.model()),
    )?;
    url.query_pairs_mut().append_pair("key", config.api_key());
    Ok(url)
}

pub fn build_prompt(tool: ToolIdentity, query: &SearchQuery) -> String {
    let filters = serde_json::to_string(query.filters()).unwrap_or_else(|_| "{}".to_string());
    let filter_instruction = match tool {
        ToolIdentity::WebDirected => {
            "You must apply the site/time_range constraints in the filters; every result has to satisfy them."
        }
        ToolIdentity::General => "Use any constraints provided in the filters to refine the search.",
    };

    [
        "Task: use the googleSearch tool to find and summarise the latest authoritative information.".to_string(),
        format!("Query: {}", query.query()),
        format!("Language: {}", query.locale()),
        format!("Number of results: {}", query.top_k()),
        format!("Filters: {filters}"),
        filter_instruction.to_string(),
        "Output format: you must return valid JSON only, with no Markdown, comments, extra text or code fences.".to_string(),
        "Output exactly this structure and nothing else: {\"items\":[{\"title\":string,\"snippet\":string,\"url\":string,\"score\":number|null}],\"metadata\":{\"source\":string,\"locale\":string,\"top_k\":number,\"filters\":object},\"usage\":{\"input_tokens\":number,\"output_tokens\":number}}.".to_string(),
        "Order items by relevance, most relevant first. Each snippet is a concise summary written in the requested language. score is a confidence between 0 and 1, or null when unknown.".to_string(),
        "metadata.source is always 'google-search'; also include locale, top_k and filters.".to_string(),
        "Never output any extra characters (including ```, explanations, lists or bold text).".to_string(),
    ]
    .join("\n")
}

pub fn build_request(tool: ToolIdentity, query: &SearchQuery) -> Value {
    json!({
        "contents": [
            { "role": "user", "parts": [{ "text": build_prompt(tool, query) }] }
        ],
        "tools": [{ "googleSearch": {} }]
    })
}

/// Take the first non-blank text part of the first candidate and recover its JSON.
pub fn parse_response(data: &Value) -> Result<SearchResultPayload, TransportError> {
    let candidate = data
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .ok_or(TransportError::EmptyResponse("response has no candidates"))?;

    let text = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
        .ok_or(TransportError::EmptyResponse(
            "first candidate has no text part",
        ))?;

    let parsed = recovery::recover_json(text).map_err(TransportError::InvalidJson)?;

    Ok(shape_payload(parsed, || {
        let meta = data.get("usageMetadata");
        usage_map(
            token_count(meta, "promptTokenCount"),
            token_count(meta, "candidatesTokenCount")
                .or_else(|| token_count(meta, "cachedContentTokenCount")),
        )
    }))
}

fn token_count<'a>(meta: Option<&'a Value>, name: &str) -> Option<&'a Value> {
    non_null(meta.and_then(|m| m.get(name)))
}

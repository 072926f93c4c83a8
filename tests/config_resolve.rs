//! Integration tests for configuration resolution feeding the transport

use std::collections::HashMap;

use deepsearch_mcp::config::{self, ConfigError, ProtocolFlavor, TransportSettings};
use deepsearch_mcp::transport::HttpTransport;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

#[test]
fn test_env_only_generative_endpoint() {
    let env = lookup(&[
        ("API_KEY", "env-key"),
        ("BASE_URL", "https://proxy.example:8443/anything?x=1"),
        ("MODEL_NAME", "gemini-2.5-pro"),
    ]);
    let config = config::resolve_with(&TransportSettings::default(), env).unwrap();
    let transport = HttpTransport::new(config).unwrap();

    assert_eq!(transport.protocol(), ProtocolFlavor::GenerativeSearch);
    assert_eq!(
        transport.endpoint().as_str(),
        "https://proxy.example:8443/v1beta/models/gemini-2.5-pro:generateContent?key=env-key"
    );
    assert_eq!(transport.config().timeout_ms(), 400_000);
}

#[test]
fn test_env_selects_chat_flavor() {
    let env = lookup(&[
        ("DEEPSEARCH_API_KEY", "k"),
        ("DEEPSEARCH_PROTOCOL", "openai"),
        ("TIMEOUT", "1.5"),
    ]);
    let config = config::resolve_with(&TransportSettings::default(), env).unwrap();
    let transport = HttpTransport::new(config).unwrap();

    assert_eq!(transport.protocol(), ProtocolFlavor::ChatCompletion);
    assert_eq!(
        transport.endpoint().as_str(),
        "https://yunwu.ai/v1/chat/completions"
    );
    assert_eq!(transport.config().timeout_ms(), 1_500);
}

#[test]
fn test_invalid_values_fail_at_construction() {
    let missing = config::resolve_with(&TransportSettings::default(), lookup(&[]));
    assert!(matches!(missing, Err(ConfigError::MissingApiKey)));

    let bad_url = config::resolve_with(
        &TransportSettings::new("k"),
        lookup(&[("DEEPSEARCH_BASE_URL", "not a url")]),
    );
    assert!(matches!(bad_url, Err(ConfigError::InvalidBaseUrl { .. })));

    let bad_timeout = config::resolve_with(
        &TransportSettings::new("k").timeout_secs(-1.0),
        lookup(&[]),
    );
    assert!(matches!(bad_timeout, Err(ConfigError::InvalidTimeout { .. })));
}

#[test]
fn test_config_error_messages_do_not_echo_key() {
    let err = config::resolve_with(
        &TransportSettings::new("super-secret").base_url("mailto:someone@example.com"),
        lookup(&[]),
    )
    .unwrap_err();

    assert!(matches!(err, ConfigError::BaseUrlWithoutHost { .. }));
    assert!(!err.to_string().contains("super-secret"));
}

pub mod flavor;

pub use flavor::ProtocolFlavor;

use std::time::Duration;
use url::{Origin, Url};

pub const DEFAULT_BASE_URL: &str = "https://yunwu.ai";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: f64 = 400.0;

/// Environment aliases, checked in order. The first non-blank value wins.
pub const API_KEY_VARS: &[&str] = &["DEEPSEARCH_API_KEY", "API_KEY", "DEEPSEARCH_TOKEN"];
pub const BASE_URL_VARS: &[&str] = &["DEEPSEARCH_BASE_URL", "BASE_URL"];
pub const MODEL_VARS: &[&str] = &["DEEPSEARCH_MODEL", "MODEL_NAME", "MODEL"];
pub const TIMEOUT_VARS: &[&str] = &["DEEPSEARCH_TIMEOUT", "TIMEOUT"];
pub const PROTOCOL_VARS: &[&str] = &["DEEPSEARCH_PROTOCOL", "PROTOCOL"];

/// Configuration errors. Always fatal for whatever was being constructed.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing API key: set one of DEEPSEARCH_API_KEY, API_KEY or DEEPSEARCH_TOKEN")]
    MissingApiKey,

    #[error("invalid base URL: {value}")]
    InvalidBaseUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base URL must have a scheme and host: {value}")]
    BaseUrlWithoutHost { value: String },

    #[error("timeout must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { value: String },

    #[error("unsupported protocol flavor: {value}")]
    UnknownProtocol { value: String },

    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// Explicit connection parameters. Anything left as `None` falls back to the
/// environment aliases, then to the built-in defaults (except the API key).
#[derive(Debug, Clone, Default)]
pub struct TransportSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<f64>,
    pub protocol: Option<ProtocolFlavor>,
}

impl TransportSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Timeout given as text, e.g. `"400"` or `"1.5"` seconds.
    pub fn timeout_str(mut self, raw: &str) -> Result<Self, ConfigError> {
        let ms = parse_timeout_secs(raw)?;
        self.timeout_secs = Some(ms as f64 / 1000.0);
        Ok(self)
    }

    pub fn protocol(mut self, protocol: ProtocolFlavor) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<TransportConfig, ConfigError> {
        resolve(self)
    }

    /// Resolve without consulting the environment at all.
    pub fn resolve_explicit(&self) -> Result<TransportConfig, ConfigError> {
        resolve_with(self, |_| None)
    }
}

/// Immutable connection settings owned by one transport.
#[derive(Clone)]
pub struct TransportConfig {
    api_key: String,
    base_url: String,
    model: String,
    timeout_ms: u64,
    protocol: ProtocolFlavor,
}

impl TransportConfig {
    /// Resolve entirely from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        resolve(&TransportSettings::default())
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// `scheme://host[:port]`, never with a path or trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn protocol(&self) -> ProtocolFlavor {
        self.protocol
    }
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_ms", &self.timeout_ms)
            .field("protocol", &self.protocol)
            .finish()
    }
}

/// Build a [`TransportConfig`] from explicit settings with environment fallbacks.
pub fn resolve(explicit: &TransportSettings) -> Result<TransportConfig, ConfigError> {
    resolve_with(explicit, |name| std::env::var(name).ok())
}

/// Same as [`resolve`], with the environment supplied by `lookup`.
pub fn resolve_with<F>(explicit: &TransportSettings, lookup: F) -> Result<TransportConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = non_blank(explicit.api_key.as_deref())
        .or_else(|| first_env(&lookup, API_KEY_VARS))
        .ok_or(ConfigError::MissingApiKey)?;

    let base_url = match non_blank(explicit.base_url.as_deref())
        .or_else(|| first_env(&lookup, BASE_URL_VARS))
    {
        Some(raw) => normalize_base_url(&raw)?,
        None => DEFAULT_BASE_URL.to_string(),
    };

    let model = non_blank(explicit.model.as_deref())
        .or_else(|| first_env(&lookup, MODEL_VARS))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let timeout_ms = match explicit.timeout_secs {
        Some(secs) => secs_to_ms(secs).ok_or_else(|| ConfigError::InvalidTimeout {
            value: secs.to_string(),
        })?,
        None => match first_env(&lookup, TIMEOUT_VARS) {
            Some(raw) => parse_timeout_secs(&raw)?,
            None => secs_to_ms(DEFAULT_TIMEOUT_SECS).unwrap_or(400_000),
        },
    };

    let protocol = match explicit.protocol {
        Some(protocol) => protocol,
        None => match first_env(&lookup, PROTOCOL_VARS) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::UnknownProtocol { value: raw })?,
            None => ProtocolFlavor::default(),
        },
    };

    Ok(TransportConfig {
        api_key,
        base_url,
        model,
        timeout_ms,
        protocol,
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_env<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .find_map(|name| non_blank(lookup(name).as_deref()))
}

/// Keep only the origin of `raw`, dropping path, query and fragment.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let parsed = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidBaseUrl {
        value: raw.to_string(),
        source,
    })?;

    match parsed.origin() {
        origin @ Origin::Tuple(..) => Ok(origin.ascii_serialization()),
        Origin::Opaque(_) => Err(ConfigError::BaseUrlWithoutHost {
            value: raw.to_string(),
        }),
    }
}

/// Parse a decimal number of seconds into milliseconds.
pub fn parse_timeout_secs(raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(secs_to_ms)
        .ok_or_else(|| ConfigError::InvalidTimeout {
            value: raw.to_string(),
        })
}

fn secs_to_ms(secs: f64) -> Option<u64> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    Some(((secs * 1000.0).round() as u64).max(1))
}

//! Error taxonomy shared by the client, agents and the MCP boundary.

use crate::config::ConfigError;
use crate::transport::TransportError;

/// Caller-input contract violations. Raised before any network I/O.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("query cannot be empty")]
    EmptyQuery,

    #[error("top_k must be a positive integer, got {0}")]
    InvalidTopK(i64),

    #[error("top_k must not exceed {max}, got {value}")]
    TopKAboveLimit { value: i64, max: i64 },

    #[error("deepsearch-web requires a non-empty `site` or `time_range` filter")]
    MissingWebFilter,
}

/// Any failure a search call can surface.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl SearchError {
    /// Stable machine-readable kind, used in structured tool failures.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::Config(_) => "config",
            SearchError::Validation(_) => "validation",
            SearchError::Transport(e) => e.kind().as_str(),
        }
    }
}

use super::{injected_client, owned_client, SearchAgent, TransportHandle};
use crate::client::DeepSearchClient;
use crate::config::{ConfigError, TransportConfig};
use crate::error::{SearchError, ValidationError};
use crate::search::{SearchOptions, SearchResult, ToolIdentity};
use crate::transport::SearchTransport;
use std::sync::Arc;

/// Site/time-directed search agent.
///
/// Every request must carry a non-empty `site` or `time_range` string filter;
/// requests without one fail before the client is reached.
pub struct DeepSearchWebAgent {
    client: DeepSearchClient,
    transport: TransportHandle,
}

impl DeepSearchWebAgent {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(TransportConfig::from_env()?)
    }

    pub fn from_config(config: TransportConfig) -> Result<Self, ConfigError> {
        let (client, transport) = owned_client(config, ToolIdentity::WebDirected)?;
        Ok(Self { client, transport })
    }

    pub fn with_transport(transport: Arc<dyn SearchTransport>) -> Self {
        let (client, transport) = injected_client(transport, ToolIdentity::WebDirected);
        Self { client, transport }
    }

    pub fn with_client(client: DeepSearchClient) -> Self {
        Self {
            client,
            transport: TransportHandle::injected(None),
        }
    }

    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, SearchError> {
        require_web_filter(options)?;
        tracing::debug!(
            query = %query,
            site = options.filter_str("site").unwrap_or_default(),
            time_range = options.filter_str("time_range").unwrap_or_default(),
            "deepsearch-web agent search"
        );
        self.client.search(query, options).await
    }

    pub fn close(&self) {
        self.transport.close();
    }
}

/// `Ok` when `filters.site` or `filters.time_range` is a non-blank string
pub fn require_web_filter(options: &SearchOptions) -> Result<(), ValidationError> {
    if options.filter_str("site").is_some() || options.filter_str("time_range").is_some() {
        Ok(())
    } else {
        Err(ValidationError::MissingWebFilter)
    }
}

#[async_trait::async_trait]
impl SearchAgent for DeepSearchWebAgent {
    fn tool(&self) -> ToolIdentity {
        ToolIdentity::WebDirected
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, SearchError> {
        DeepSearchWebAgent::search(self, query, options).await
    }

    fn close(&self) {
        DeepSearchWebAgent::close(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_require_web_filter() {
        assert!(require_web_filter(&SearchOptions::default().filter("site", "docs.rs")).is_ok());
        assert!(require_web_filter(&SearchOptions::default().filter("time_range", "7d")).is_ok());

        for options in [
            SearchOptions::default(),
            SearchOptions::default().filter("site", ""),
            SearchOptions::default().filter("time_range", "   "),
            SearchOptions::default().filter("site", json!(["docs.rs"])),
            SearchOptions::default().filter("domain", "docs.rs"),
        ] {
            assert_eq!(
                require_web_filter(&options),
                Err(ValidationError::MissingWebFilter)
            );
        }
    }
}

use super::{injected_client, owned_client, SearchAgent, TransportHandle};
use crate::client::DeepSearchClient;
use crate::config::{ConfigError, TransportConfig};
use crate::error::SearchError;
use crate::search::{SearchOptions, SearchResult, ToolIdentity};
use crate::transport::SearchTransport;
use std::sync::Arc;

/// General search agent - passes queries straight to the client
pub struct DeepSearchAgent {
    client: DeepSearchClient,
    transport: TransportHandle,
}

impl DeepSearchAgent {
    /// Build an agent that owns an HTTP transport resolved from the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_config(TransportConfig::from_env()?)
    }

    pub fn from_config(config: TransportConfig) -> Result<Self, ConfigError> {
        let (client, transport) = owned_client(config, ToolIdentity::General)?;
        Ok(Self { client, transport })
    }

    /// Use a caller-owned transport. [`close`](Self::close) leaves it alone.
    pub fn with_transport(transport: Arc<dyn SearchTransport>) -> Self {
        let (client, transport) = injected_client(transport, ToolIdentity::General);
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
        tracing::debug!(query = %query, "deepsearch agent search");
        self.client.search(query, options).await
    }

    pub fn close(&self) {
        self.transport.close();
    }
}

#[async_trait::async_trait]
impl SearchAgent for DeepSearchAgent {
    fn tool(&self) -> ToolIdentity {
        ToolIdentity::General
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, SearchError> {
        DeepSearchAgent::search(self, query, options).await
    }

    fn close(&self) {
        DeepSearchAgent::close(self);
    }
}

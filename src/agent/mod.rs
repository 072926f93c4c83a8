//! Search agents: thin policy wrappers over [`DeepSearchClient`].
//!
//! An agent either builds its own [`HttpTransport`] (from the environment or a
//! config) and then owns it, or is handed a transport/client by the caller.
//! Only owned transports are closed by the agent.

pub mod general;
pub mod web;

pub use general::DeepSearchAgent;
pub use web::DeepSearchWebAgent;

use crate::client::DeepSearchClient;
use crate::config::{ConfigError, TransportConfig};
use crate::error::SearchError;
use crate::search::{SearchOptions, SearchResult, ToolIdentity};
use crate::transport::{HttpTransport, SearchTransport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Agent abstraction - what the MCP boundary dispatches tool calls to
#[async_trait::async_trait]
pub trait SearchAgent: Send + Sync {
    fn tool(&self) -> ToolIdentity;

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<SearchResult, SearchError>;

    /// Release resources this agent created. Idempotent.
    fn close(&self);
}

/// Transport reference tagged with who created it
pub(crate) struct TransportHandle {
    transport: Option<Arc<dyn SearchTransport>>,
    owned: bool,
    closed: AtomicBool,
}

impl TransportHandle {
    fn owned(transport: Arc<dyn SearchTransport>) -> Self {
        Self {
            transport: Some(transport),
            owned: true,
            closed: AtomicBool::new(false),
        }
    }

    fn injected(transport: Option<Arc<dyn SearchTransport>>) -> Self {
        Self {
            transport,
            owned: false,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_owned(&self) -> bool {
        self.owned
    }

    fn close(&self) {
        if !self.owned || self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(transport) = &self.transport {
            transport.close();
        }
    }
}

impl Drop for TransportHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build an owned HTTP transport and a client bound to `tool`.
fn owned_client(
    config: TransportConfig,
    tool: ToolIdentity,
) -> Result<(DeepSearchClient, TransportHandle), ConfigError> {
    let transport: Arc<dyn SearchTransport> = Arc::new(HttpTransport::new(config)?);
    let client = DeepSearchClient::new(transport.clone(), tool);
    Ok((client, TransportHandle::owned(transport)))
}

fn injected_client(
    transport: Arc<dyn SearchTransport>,
    tool: ToolIdentity,
) -> (DeepSearchClient, TransportHandle) {
    let client = DeepSearchClient::new(transport.clone(), tool);
    (client, TransportHandle::injected(Some(transport)))
}

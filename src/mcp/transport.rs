//! Stdio transport and process lifecycle for the MCP server.

use rmcp::transport::io::stdio;
use rmcp::ServiceExt;

use super::server::DeepSearchServer;

/// Serve over stdin/stdout until the client disconnects or the process gets
/// SIGINT/SIGTERM, then close the server's managed agents.
///
/// # Errors
///
/// Returns an error if the MCP handshake fails or the service task panics.
pub async fn serve_stdio(server: DeepSearchServer) -> anyhow::Result<()> {
    tracing::info!("deepsearch MCP server starting on stdio");
    let service = server.clone().serve(stdio()).await?;

    tokio::select! {
        quit = service.waiting() => {
            quit?;
            tracing::info!("MCP client disconnected");
        }
        signal = shutdown_signal() => {
            tracing::info!(signal, "shutdown signal received");
        }
    }

    server.shutdown();
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::warn!(error = %e, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}

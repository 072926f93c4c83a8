use anyhow::Result;

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    deepsearch_mcp::cli::run().await
}

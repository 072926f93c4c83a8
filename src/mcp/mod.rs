//! MCP (Model Context Protocol) boundary.
//!
//! Exposes the two search agents as tools over stdio:
//!
//! ```text
//! MCP client
//!   ↓ deepsearch (query, top_k?, locale?, filters?)
//!   ↓ deepsearch-web (query, top_k?, locale?, filters with site or time_range)
//! DeepSearchServer          (top_k <= 10, request span, structured errors)
//!   ↓
//! DeepSearchAgent / DeepSearchWebAgent
//!   ↓
//! DeepSearchClient → HttpTransport (chat-completion | generative-search)
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::{DeepSearchParams, DeepSearchWebParams};
pub use server::DeepSearchServer;
pub use transport::serve_stdio;

//! DeepSearch MCP library
//!
//! Search-grounded model transports, the normalizing client, the two search
//! agents and the MCP server that exposes them as tools.

pub mod agent;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod search;
pub mod transport;

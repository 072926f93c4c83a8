//! Command-line entry: `serve` (default) runs the MCP server on stdio,
//! `search` performs one call and prints the result.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::agent::{DeepSearchAgent, DeepSearchWebAgent, SearchAgent};
use crate::config::{ProtocolFlavor, TransportConfig, TransportSettings};
use crate::logging::{self, LogRotation, LogSettings, DEFAULT_LOG_DIR};
use crate::mcp::{serve_stdio, DeepSearchServer};
use crate::search::SearchOptions;

#[derive(Parser, Debug)]
#[command(name = "deepsearch-mcp")]
#[command(version, about = "DeepSearch MCP server", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub upstream: UpstreamArgs,

    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Upstream overrides. Unset values fall back to the environment.
#[derive(Args, Debug, Default)]
pub struct UpstreamArgs {
    /// Upstream origin, e.g. https://yunwu.ai
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Model name
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    /// Protocol flavor: chat-completion or generative-search
    #[arg(long, global = true)]
    pub protocol: Option<ProtocolFlavor>,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Directory for log files
    #[arg(long, global = true, env = "DEEPSEARCH_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: PathBuf,

    /// Log level for this crate (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "DEEPSEARCH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// session (one file per run) or daily
    #[arg(long, global = true, env = "DEEPSEARCH_LOG_ROTATION", default_value = "session")]
    pub log_rotation: LogRotation,

    /// Rotated log files to keep (0 keeps everything)
    #[arg(long, global = true, env = "DEEPSEARCH_LOG_KEEP")]
    pub log_keep: Option<usize>,

    /// Disable the log file entirely
    #[arg(long, global = true)]
    pub no_log: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server on stdin/stdout (default)
    Serve,

    /// Run a single search and print the JSON result
    #[command(after_help = r#"Examples:
  deepsearch-mcp search "rust async runtime"
  deepsearch-mcp search "tokio release notes" --web --site github.com --top-k 3
  deepsearch-mcp search "AI news" --web --time-range 7d --locale en-US
"#)]
    Search(SearchArgs),
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Number of results
    #[arg(short = 'k', long)]
    pub top_k: Option<i64>,

    /// Result language, e.g. zh-CN
    #[arg(short, long)]
    pub locale: Option<String>,

    /// Restrict to a site (web search)
    #[arg(long)]
    pub site: Option<String>,

    /// Restrict to a time window, e.g. 7d (web search)
    #[arg(long)]
    pub time_range: Option<String>,

    /// Use the site/time-directed tool
    #[arg(long)]
    pub web: bool,
}

impl SearchArgs {
    fn options(&self) -> SearchOptions {
        let mut options = SearchOptions {
            top_k: self.top_k,
            locale: self.locale.clone(),
            filters: None,
        };
        if let Some(site) = &self.site {
            options = options.filter("site", site.as_str());
        }
        if let Some(range) = &self.time_range {
            options = options.filter("time_range", range.as_str());
        }
        options
    }
}

impl UpstreamArgs {
    fn settings(&self) -> TransportSettings {
        TransportSettings {
            api_key: None,
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout_secs: self.timeout,
            protocol: self.protocol,
        }
    }
}

impl LogArgs {
    fn settings(&self) -> LogSettings {
        LogSettings {
            enabled: !self.no_log,
            dir: self.log_dir.clone(),
            level: self.log_level.clone(),
            rotation: self.log_rotation,
            keep: self.log_keep,
            ..LogSettings::default()
        }
    }
}

/// Parse arguments and run the selected command.
pub async fn run() -> Result<()> {
    // .env must be loaded before clap reads env-backed flags
    let dotenv = dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _guard = logging::init(&cli.log.settings())?;

    if let Some(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let config = cli
        .upstream
        .settings()
        .resolve()
        .context("Failed to resolve DeepSearch configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let server = DeepSearchServer::from_config(config)
                .context("Failed to start DeepSearch server")?;
            serve_stdio(server).await
        }
        Commands::Search(args) => search_once(config, &args).await,
    }
}

async fn search_once(config: TransportConfig, args: &SearchArgs) -> Result<()> {
    let agent: Box<dyn SearchAgent> = if args.web {
        Box::new(DeepSearchWebAgent::from_config(config)?)
    } else {
        Box::new(DeepSearchAgent::from_config(config)?)
    };

    let started = Instant::now();
    let outcome = agent.search(&args.query, &args.options()).await;
    let elapsed = started.elapsed();
    agent.close();

    let result = outcome.with_context(|| format!("{} search failed", agent.tool().tool_name()))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    eprintln!(
        "{} result(s) in {:.2}s",
        result.items.len(),
        elapsed.as_secs_f64()
    );
    Ok(())
}

use anyhow::{Context, Result};
use regex::Regex;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_DIR: &str = "log";
pub const DEFAULT_LOG_FILE: &str = "deepsearch-mcp.log";

#[allow(dead_code)]
pub struct LogGuard(tracing_appender::non_blocking::WorkerGuard);

/// How log files are split on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogRotation {
    /// One file per process run: `{file}.session-{YYYYmmdd-HHMMSS}`
    #[default]
    Session,
    /// `tracing_appender` daily rolling: `{file}.{YYYY-MM-DD}`
    Daily,
}

impl std::str::FromStr for LogRotation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(LogRotation::Session),
            "daily" => Ok(LogRotation::Daily),
            other => Err(format!("unknown log rotation: {other}")),
        }
    }
}

/// Where and how much to log
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub enabled: bool,
    pub dir: PathBuf,
    pub file_name: String,
    /// `EnvFilter` level for this crate; everything else logs at `warn`
    pub level: String,
    pub rotation: LogRotation,
    /// Rotated files to keep (default: 20 sessions or 7 days, 0 = keep all)
    pub keep: Option<usize>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: DEFAULT_LOG_FILE.to_string(),
            level: "info".to_string(),
            rotation: LogRotation::Session,
            keep: None,
        }
    }
}

/// Initialize file logging.
///
/// Records are appended to a file under `settings.dir`, never to stdout,
/// which carries the MCP protocol. When logging is disabled this is a no-op.
pub fn init(settings: &LogSettings) -> Result<Option<LogGuard>> {
    if !settings.enabled {
        return Ok(None);
    }

    let dir = &settings.dir;
    let base_name = &settings.file_name;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    cleanup_rotated_logs(dir, settings.rotation, base_name, settings.keep)?;

    let (writer, log_path_for_display, guard): (
        NonBlocking,
        PathBuf,
        tracing_appender::non_blocking::WorkerGuard,
    ) = match settings.rotation {
        LogRotation::Daily => {
            let appender = tracing_appender::rolling::daily(dir, base_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (non_blocking, dir.join(base_name), guard)
        }
        LogRotation::Session => {
            let session_path = build_session_log_path(dir, base_name);
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&session_path)
                .with_context(|| format!("Failed to open log file: {}", session_path.display()))?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            (non_blocking, session_path, guard)
        }
    };

    let directive = format!("deepsearch_mcp={},warn", settings.level);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer)
        .try_init()
        .ok(); // Already initialized (e.g. in tests)

    tracing::info!(
        log_file = %log_path_for_display.display(),
        rotation = ?settings.rotation,
        "writing logs to file"
    );

    Ok(Some(LogGuard(guard)))
}

fn build_session_log_path(dir: &Path, base_name: &str) -> PathBuf {
    let ts = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
    dir.join(format!("{base_name}.session-{ts}"))
}

fn cleanup_rotated_logs(
    dir: &Path,
    rotation: LogRotation,
    base_name: &str,
    keep: Option<usize>,
) -> Result<()> {
    let keep = keep.unwrap_or(match rotation {
        LogRotation::Daily => 7,
        LogRotation::Session => 20,
    });

    if keep == 0 {
        return Ok(());
    }

    let prefix = match rotation {
        // tracing_appender::rolling::daily uses: `{base_name}.{YYYY-MM-DD}`
        LogRotation::Daily => format!("{base_name}."),
        LogRotation::Session => format!("{base_name}.session-"),
    };

    let mut candidates: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory: {}", dir.display()))?
    {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else { continue };
        if name.starts_with(&prefix) {
            candidates.push(name.to_string());
        }
    }

    candidates.sort();
    candidates.reverse(); // newest first (lexicographic works for our suffix formats)

    for name in candidates.iter().skip(keep) {
        let path = dir.join(name);
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::debug!(error = %e, file = %path.display(), "failed to remove old log file");
        }
    }

    Ok(())
}

static OPENAI_STYLE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sk-[A-Za-z0-9_-]{8,}").expect("sk- key regex"));
static BEARER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(bearer\s+)[A-Za-z0-9._~+/=-]+").expect("bearer token regex")
});
static KEY_QUERY_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([?&]key=)[^&\s"']+"#).expect("key query regex"));

/// Best-effort redaction of credentials that upstream error bodies tend to echo:
/// `sk-...` keys, `Bearer ...` tokens and `key=` query parameters.
pub fn redact_secrets(input: &str) -> String {
    let out = OPENAI_STYLE_KEY.replace_all(input, "sk-***REDACTED***");
    let out = BEARER_TOKEN.replace_all(&out, "${1}***REDACTED***");
    KEY_QUERY_PARAM
        .replace_all(&out, "${1}***REDACTED***")
        .into_owned()
}

//! Logging via `tracing` and `tracing-subscriber`.
//!
//! Events go to stderr so `--json` stdout stays machine-readable.
//!
//! - `warn`: rollbacks, skipped assets, swallowed cleanup failures
//! - `info`: migrations, import completion
//! - `debug`: export/plan/validation details

use std::io;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unknown log format `{other}` (expected pretty, compact or json)"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            with_ansi: false,
        }
    }
}

impl LogConfig {
    /// Start from the configured level/format; each `-v` raises verbosity.
    pub fn resolve(level: &str, format: &str, verbosity: u8) -> Result<Self, String> {
        let base: Level = level
            .parse()
            .map_err(|_| format!("unknown log level `{level}`"))?;
        let level = match verbosity {
            0 => base,
            1 => base.max(Level::DEBUG),
            _ => Level::TRACE,
        };
        Ok(Self {
            level,
            format: format.parse()?,
            with_ansi: false,
        })
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) {
    let filter = build_env_filter(config.level);
    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_ansi(config.with_ansi)
                    .with_target(false)
                    .without_time(),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_ansi(config.with_ansi),
            )
            .init(),
    }
}

/// `RUST_LOG` wins; otherwise our crates log at `level` and dependencies at warn.
fn build_env_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,canvasport={level},canvasport_kernel={level},canvasport_coherence={level},\
             canvasport_store={level},canvasport_import={level}"
        ))
    })
}

//! Process-wide logging setup shared by Burrow binaries.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable, one event per line.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("unknown log format: {0}")]
    UnknownFormat(String),
    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Installs the global `tracing` subscriber.
///
/// Verbosity comes from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
/// Fails if a global subscriber is already set.
pub fn init(format: LogFormat) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| TelemetryError::Install(e.to_string()))?;
    tracing::debug!(format = %format, "Tracing initialized");
    Ok(())
}

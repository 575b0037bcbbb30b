use burrow_reaper::{DEFAULT_CLEANUP_CRON, DEFAULT_CRON_ZONE};
use burrow_telemetry::LogFormat;
use clap::{Parser, ValueEnum};

pub const CLEANUP_ENABLED_ENV: &str = "BURROW_REAPER_CLEANUP_ENABLED";
pub const CLEANUP_CRON_ENV: &str = "BURROW_REAPER_CLEANUP_CRON";
pub const CRON_ZONE_ENV: &str = "BURROW_REAPER_CRON_ZONE";
pub const MYSQL_DSN_ENV: &str = "BURROW_REAPER_MYSQL_DSN";
pub const REDIS_URL_ENV: &str = "BURROW_REAPER_REDIS_URL";
pub const LOG_FORMAT_ENV: &str = "BURROW_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Runs against the MySQL store and Redis cache shared with the engine.
#[derive(Debug, Parser)]
#[command(name = "burrow-reaper")]
pub struct CLI {
    #[arg(
        long,
        env = CLEANUP_ENABLED_ENV,
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub cleanup_enabled: bool,

    #[arg(long, env = CLEANUP_CRON_ENV, default_value = DEFAULT_CLEANUP_CRON)]
    pub cleanup_cron: String,

    #[arg(long, env = CRON_ZONE_ENV, default_value = DEFAULT_CRON_ZONE)]
    pub cron_zone: String,

    /// DSN of the MySQL database the engine writes to.
    #[arg(long, env = MYSQL_DSN_ENV)]
    pub mysql_dsn: String,

    /// URL of the Redis cache the engine resolves through.
    #[arg(long, env = REDIS_URL_ENV)]
    pub redis_url: String,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

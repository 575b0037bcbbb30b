use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReaperError>;

#[derive(Debug, Error)]
pub enum ReaperError {
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidCron { expression: String, reason: String },
    #[error("unknown time zone '{zone}': {reason}")]
    InvalidTimezone { zone: String, reason: String },
}

//! Scheduled removal of expired short URLs from the cache tier and the store.

pub mod error;
pub mod reaper;
pub mod schedule;

pub use error::{ReaperError, Result};
pub use reaper::{ReapReport, Reaper, ReaperSettings, RunOutcome};
pub use schedule::{ReaperSchedule, DEFAULT_CLEANUP_CRON, DEFAULT_CRON_ZONE};

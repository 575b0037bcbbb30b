use crate::error::{ReaperError, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use jiff::Timestamp;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CLEANUP_CRON: &str = "0 0 * * * *";
pub const DEFAULT_CRON_ZONE: &str = "UTC";

/// When the reaper fires.
///
/// Expressions have six fields with seconds first
/// (`sec min hour day-of-month month day-of-week`), evaluated in an IANA
/// time zone so that wall-clock schedules follow daylight saving changes.
#[derive(Debug, Clone)]
pub struct ReaperSchedule {
    expression: String,
    schedule: Schedule,
    zone: Tz,
}

impl ReaperSchedule {
    pub fn new(expression: &str, zone: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|e| ReaperError::InvalidCron {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;
        let zone = zone
            .parse::<Tz>()
            .map_err(|e| ReaperError::InvalidTimezone {
                zone: zone.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
            zone,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn zone(&self) -> Tz {
        self.zone
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: Timestamp) -> Option<Timestamp> {
        let nanos = u32::try_from(after.subsec_nanosecond()).ok()?;
        let after = DateTime::<Utc>::from_timestamp(after.as_second(), nanos)?
            .with_timezone(&self.zone);
        let next = self.schedule.after(&after).next()?;
        let nanos = i32::try_from(next.timestamp_subsec_nanos()).ok()?;
        Timestamp::new(next.timestamp(), nanos).ok()
    }

    /// Time left until the next fire time, measured from `now`.
    pub fn until_next(&self, now: Timestamp) -> Option<Duration> {
        let next = self.next_after(now)?;
        Duration::try_from(next.duration_since(now)).ok()
    }
}

use crate::error::{EngineError, Result};
use burrow_core::MAX_KEY_LENGTH;
use jiff::SignedDuration;
use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_KEY_LENGTH: usize = 6;
pub const DEFAULT_URL_TTL_DAYS: u32 = 30;
pub const DEFAULT_CACHE_TTL_DAYS: u32 = 1;

/// Longest TTL accepted for either tier, roughly a century.
pub const MAX_TTL_DAYS: u32 = 36_500;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Tunables of the short URL engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct EngineSettings {
    /// Number of characters in a generated key.
    #[builder(default = DEFAULT_KEY_LENGTH)]
    pub key_length: usize,
    /// Lifetime of a record, counted from creation.
    #[builder(default = DEFAULT_URL_TTL_DAYS)]
    pub url_ttl_days: u32,
    /// Upper bound on how long a resolved record stays cached.
    #[builder(default = DEFAULT_CACHE_TTL_DAYS)]
    pub cache_ttl_days: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_KEY_LENGTH).contains(&self.key_length) {
            return Err(EngineError::Settings(format!(
                "key length must be between 1 and {MAX_KEY_LENGTH}, got {}",
                self.key_length
            )));
        }
        check_days("url ttl", self.url_ttl_days)?;
        check_days("cache ttl", self.cache_ttl_days)?;
        Ok(())
    }

    pub fn url_ttl(&self) -> SignedDuration {
        SignedDuration::from_hours(i64::from(self.url_ttl_days) * 24)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.cache_ttl_days) * SECONDS_PER_DAY)
    }
}

fn check_days(name: &str, days: u32) -> Result<()> {
    if !(1..=MAX_TTL_DAYS).contains(&days) {
        return Err(EngineError::Settings(format!(
            "{name} must be between 1 and {MAX_TTL_DAYS} days, got {days}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = EngineSettings::default();
        assert_eq!(settings.key_length, 6);
        assert_eq!(settings.url_ttl_days, 30);
        assert_eq!(settings.cache_ttl_days, 1);
        assert!(settings.validate().is_ok());
        assert_eq!(settings.url_ttl(), SignedDuration::from_hours(720));
        assert_eq!(settings.cache_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn rejects_out_of_range_values() {
        for settings in [
            EngineSettings::builder().key_length(0).build(),
            EngineSettings::builder().key_length(51).build(),
            EngineSettings::builder().url_ttl_days(0).build(),
            EngineSettings::builder().cache_ttl_days(0).build(),
            EngineSettings::builder().url_ttl_days(MAX_TTL_DAYS + 1).build(),
        ] {
            assert!(matches!(settings.validate(), Err(EngineError::Settings(_))));
        }
    }

    #[test]
    fn accepts_boundaries() {
        let settings = EngineSettings::builder()
            .key_length(50)
            .url_ttl_days(1)
            .cache_ttl_days(MAX_TTL_DAYS)
            .build();
        assert!(settings.validate().is_ok());
    }
}

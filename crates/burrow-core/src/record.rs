use crate::error::{CoreError, Result};
use crate::key::ShortKey;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

/// Upper bound on the length of a record id accepted from a caller.
pub const MAX_ID_LENGTH: usize = 50;

/// Opaque, store-assigned identifier of a [`ShortUrlRecord`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Parses caller input: non-empty, alphanumeric, at most 50 characters.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_ID_LENGTH {
            return Err(CoreError::InvalidId(format!(
                "length must be between 1 and {}, got {}",
                MAX_ID_LENGTH,
                id.len()
            )));
        }
        if !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidId(format!(
                "must be alphanumeric: '{}'",
                id
            )));
        }
        Ok(Self(id))
    }

    /// Creates a `RecordId` without validation. Stores use this for ids they mint.
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the principal that owns a record.
///
/// Supplied by the authentication layer; the core only refuses blank values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Owner(String);

impl Owner {
    pub fn new(owner: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(CoreError::MissingOwner);
        }
        Ok(Self(owner))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted short URL.
///
/// Field names match the persisted document shape so the same value can be
/// written to the cache tier as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortUrlRecord {
    pub id: RecordId,
    pub key: ShortKey,
    pub url: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    /// The creating principal.
    #[serde(rename = "created_by")]
    pub owner: Owner,
    pub last_updated_at: Timestamp,
    /// Auditing only; never surfaced to callers.
    pub last_updated_by: String,
    pub expires_at: Timestamp,
}

impl ShortUrlRecord {
    /// A record is live while its expiry lies strictly in the future.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.expires_at > now
    }

    /// Time left until expiry, or `None` once the record is no longer live.
    pub fn remaining_ttl(&self, now: Timestamp) -> Option<Duration> {
        if !self.is_live(now) {
            return None;
        }
        Duration::try_from(self.expires_at.duration_since(now)).ok()
    }
}

/// The fields a caller decides when creating a record. The store assigns the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShortUrlRecord {
    pub key: ShortKey,
    pub url: String,
    pub description: Option<String>,
    pub owner: Owner,
    pub expires_at: Timestamp,
}

/// One page of an owner-scoped listing together with the total match count.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.size == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.size))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) + 1 < self.total_pages()
    }
}

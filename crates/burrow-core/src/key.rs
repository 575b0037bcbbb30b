use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// The 62 characters a short key may be drawn from.
pub const KEY_ALPHABET: &[u8; 62] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Upper bound on the length of any key accepted from a caller.
pub const MAX_KEY_LENGTH: usize = 50;

/// A short alphanumeric key that resolves to a stored URL.
///
/// Keys double as access tokens to the target URL, so they are only ever
/// produced by a secure generator or parsed from caller input against the
/// configured key length.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortKey(String);

impl ShortKey {
    /// Parses caller input as a key of exactly `length` alphanumeric characters.
    pub fn parse(key: impl Into<String>, length: usize) -> Result<Self> {
        let key = key.into();
        Self::validate(&key, length)?;
        Ok(Self(key))
    }

    /// Creates a `ShortKey` without validation.
    ///
    /// Use this only for keys produced by trusted internal sources
    /// (the key generator, or rows read back from the store).
    pub fn new_unchecked(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(key: &str, length: usize) -> Result<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CoreError::InvalidKey(format!(
                "length must not exceed {}, got {}",
                MAX_KEY_LENGTH,
                key.len()
            )));
        }

        if key.len() != length {
            return Err(CoreError::InvalidKey(format!(
                "length must be exactly {}, got {}",
                length,
                key.len()
            )));
        }

        if !key.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidKey(format!(
                "must contain only alphanumeric characters: '{}'",
                key
            )));
        }

        Ok(())
    }
}

impl Display for ShortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShortKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

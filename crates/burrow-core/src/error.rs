use thiserror::Error;

/// Errors raised while constructing core value types.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid short key: {0}")]
    InvalidKey(String),
    #[error("invalid record id: {0}")]
    InvalidId(String),
    #[error("owner identity is missing")]
    MissingOwner,
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("key already held by a live record: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Whether the failure may succeed when the same call is issued again.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Timeout(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache serialization failed: {0}")]
    Serialization(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache initialization failed: {0}")]
    Initialization(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_storage_errors() {
        assert!(StorageError::Unavailable("down".into()).is_transient());
        assert!(StorageError::Timeout("slow".into()).is_transient());
        assert!(!StorageError::Conflict("abc123".into()).is_transient());
        assert!(!StorageError::InvalidData("bad row".into()).is_transient());
    }
}

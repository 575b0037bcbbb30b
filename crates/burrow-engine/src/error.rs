use burrow_core::{CoreError, StorageError};
use std::fmt;
use thiserror::Error;

/// Type alias for engine results.
pub type Result<T> = std::result::Result<T, EngineError>;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub rejected_value: Option<String>,
    pub reason: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// All field errors found while validating one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, rejected_value: Option<&str>, reason: &'static str) {
        self.0.push(FieldError {
            field,
            rejected_value: rejected_value.map(str::to_owned),
            reason,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Returns true if any error was recorded for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl IntoIterator for FieldErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(FieldErrors),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("no free key after {attempts} attempts")]
    KeyExhausted { attempts: u32 },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid settings: {0}")]
    Settings(String),
}

impl EngineError {
    /// True when the failure was caused by key contention.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::KeyExhausted { .. } | Self::Storage(StorageError::Conflict(_))
        )
    }

    /// True when the caller supplied something the engine refuses.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::InvalidParameter(_)
                | Self::InvalidKey(_)
                | Self::NotFound(_)
                | Self::AccessDenied(_)
        )
    }
}

impl From<FieldErrors> for EngineError {
    fn from(value: FieldErrors) -> Self {
        Self::InvalidInput(value)
    }
}

impl From<CoreError> for EngineError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidKey(message) => Self::InvalidKey(message),
            CoreError::InvalidId(message) => Self::InvalidParameter(message),
            CoreError::MissingOwner => Self::AccessDenied(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_display_joins_reasons() {
        let mut errors = FieldErrors::new();
        errors.push("url", None, "url is required");
        errors.push("description", Some("x"), "description is too long");

        assert_eq!(
            errors.to_string(),
            "url: url is required; description: description is too long"
        );
        assert!(errors.has_field("description"));
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn classification() {
        assert!(EngineError::KeyExhausted { attempts: 3 }.is_conflict());
        assert!(EngineError::Storage(StorageError::Conflict("abc".into())).is_conflict());
        assert!(!EngineError::NotFound("x".into()).is_conflict());

        assert!(EngineError::AccessDenied("x".into()).is_client_error());
        assert!(EngineError::InvalidKey("x".into()).is_client_error());
        assert!(!EngineError::Storage(StorageError::Timeout("x".into())).is_client_error());
        assert!(!EngineError::KeyExhausted { attempts: 3 }.is_client_error());
    }

    #[test]
    fn core_errors_map_to_engine_kinds() {
        assert!(matches!(
            EngineError::from(CoreError::MissingOwner),
            EngineError::AccessDenied(_)
        ));
        assert!(matches!(
            EngineError::from(CoreError::InvalidId("!".into())),
            EngineError::InvalidParameter(_)
        ));
    }
}

//! Lifecycle rules for short URLs: creation with collision retry, owner-scoped
//! reads and deletes, and cache-aside resolution.

pub mod engine;
pub mod error;
pub mod settings;
pub mod validation;

pub use engine::{ShortUrlEngine, MAX_CREATE_ATTEMPTS};
pub use error::{EngineError, FieldError, FieldErrors, Result};
pub use settings::EngineSettings;
pub use validation::ShortUrlInput;

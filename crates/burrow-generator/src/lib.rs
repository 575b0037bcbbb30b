//! Short key generation.

pub mod random;

pub use random::RandomKeyGenerator;

use burrow_core::ShortKey;

/// Trait for generating candidate short keys.
///
/// Implementations are pure generators that don't interact with storage;
/// collision handling belongs to the caller. Keys act as access tokens, so
/// production implementations must not be predictable from prior output.
pub trait KeyGenerator: Send + Sync + 'static {
    /// Generates a key of exactly `length` characters from the key alphabet.
    fn generate(&self, length: usize) -> ShortKey;
}

use crate::KeyGenerator;
use burrow_core::{ShortKey, KEY_ALPHABET};
use std::iter;

/// Draws every character uniformly from [`KEY_ALPHABET`] using the thread-local
/// CSPRNG, which is periodically reseeded from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomKeyGenerator;

impl RandomKeyGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl KeyGenerator for RandomKeyGenerator {
    fn generate(&self, length: usize) -> ShortKey {
        let key: String = iter::repeat_with(|| {
            KEY_ALPHABET[rand::random_range(0..KEY_ALPHABET.len())] as char
        })
        .take(length)
        .collect();
        ShortKey::new_unchecked(key)
    }
}

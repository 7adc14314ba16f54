//! Short code generation
//!
//! Producing short codes is a collaborator concern: the record store only
//! receives finished codes. [`RandomSlug`] is the default generator.

use rand::{distr::Alphanumeric, Rng};

/// Codes that would shadow API paths
pub const RESERVED_CODES: &[&str] = &["api"];

/// Longest custom alias accepted
pub const MAX_ALIAS_LENGTH: usize = 64;

pub trait ShortCodeGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random alphanumeric slug, 6 characters by default
#[derive(Debug, Clone)]
pub struct RandomSlug {
    pub length: usize,
}

impl Default for RandomSlug {
    fn default() -> Self {
        Self { length: 6 }
    }
}

impl ShortCodeGenerator for RandomSlug {
    fn generate(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// Whether a user-chosen alias can be used as a short code
pub fn is_valid_alias(alias: &str) -> bool {
    !alias.is_empty()
        && alias.len() <= MAX_ALIAS_LENGTH
        && alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !RESERVED_CODES.contains(&alias)
}

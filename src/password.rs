use bcrypt::{hash, verify};
use rand::{distr::Alphanumeric, Rng};

use crate::error::StoreError;

/// Length of generated session tokens
pub const TOKEN_LENGTH: usize = 32;

pub fn hash_password(password: &str, cost: u32) -> Result<String, StoreError> {
    Ok(hash(password, cost)?)
}

/// Checks a password against a stored bcrypt hash
///
/// Anything that is not a valid bcrypt hash (for instance a credential carried
/// over from an old export) never verifies.
pub fn verify_password(password: &str, hashed: &str) -> bool {
    verify(password, hashed).unwrap_or(false)
}

pub fn generate_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

//! Password hashing and the account password policy.
//!
//! Hashes are Argon2id in PHC string form, so parameters and salt travel
//! with the hash and can be tightened later without a migration.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error as HashError, PasswordHash, PasswordVerifier, SaltString};
use argon2::{Argon2, PasswordHasher};

/// Shortest password accepted on creation and change.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// Compare a plaintext password against a stored PHC hash.
///
/// A mismatch is `Ok(false)`; `Err` is reserved for malformed hashes.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(other) => Err(other),
    }
}

/// Apply the password policy, returning a user-facing message on rejection.
pub fn enforce_password_policy(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long"
        ));
    }
    Ok(())
}

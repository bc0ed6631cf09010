use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

/// Hashes a password with Argon2id and a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordHashError(e.to_string()))
}

/// A malformed stored hash verifies as false.
pub fn verify_password(plain: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(plain.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

// Argon2 is CPU-bound. Async callers go through these, which run it inside
// tokio::task::spawn_blocking.

pub async fn hash_password_async(plain: &str) -> Result<String, PasswordHashError> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| PasswordHashError(format!("spawn_blocking failed in hashing: {e}")))?
}

pub async fn verify_password_async(plain: &str, stored_hash: &str) -> bool {
    let (plain, stored_hash) = (plain.to_owned(), stored_hash.to_owned());
    tokio::task::spawn_blocking(move || verify_password(&plain, &stored_hash))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("spawn_blocking failed in verification: {e}");
            false
        })
}

//! Argon2 password hashing, run off the async executor.

use anyhow::Context as _;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::ShopError;

pub const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

pub fn validate_password(password: &str) -> Result<(), ShopError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ShopError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(ShopError::Validation(format!(
            "password must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn hash_blocking(password: &str) -> Result<String, ShopError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ShopError::Internal(anyhow::anyhow!("argon2 hash failed: {e}")))
}

fn verify_blocking(password: &str, stored: &str) -> Result<bool, ShopError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ShopError::Internal(anyhow::anyhow!("stored hash is not PHC: {e}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(ShopError::Internal(anyhow::anyhow!("argon2 verify failed: {e}"))),
    }
}

pub async fn hash_password(password: String) -> Result<String, ShopError> {
    tokio::task::spawn_blocking(move || hash_blocking(&password))
        .await
        .context("join password hashing task")?
}

pub async fn verify_password(password: String, stored: String) -> Result<bool, ShopError> {
    tokio::task::spawn_blocking(move || verify_blocking(&password, &stored))
        .await
        .context("join password verification task")?
}

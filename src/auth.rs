//! Admin password hashing and credential checks.

use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use std::sync::OnceLock;

use crate::db::{Admin, Database};

/// Hash a password into an argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Check a password against a stored PHC string. Unparseable hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is not a valid PHC string: {}", e);
            false
        }
    }
}

/// A real hash to verify against when the username is unknown, so that
/// path costs the same argon2 work as a wrong password.
fn dummy_hash() -> Result<&'static str> {
    static DUMMY: OnceLock<String> = OnceLock::new();
    if let Some(hash) = DUMMY.get() {
        return Ok(hash.as_str());
    }
    let hash = hash_password("gallery-unknown-admin")?;
    Ok(DUMMY.get_or_init(|| hash).as_str())
}

/// Look up an admin and check the password. `None` for unknown user or wrong password.
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<Option<Admin>> {
    let Some(admin) = db.find_admin_by_username(username)? else {
        let _ = verify_password(password, dummy_hash()?);
        return Ok(None);
    };
    if verify_password(password, &admin.password_hash) {
        Ok(Some(admin))
    } else {
        Ok(None)
    }
}

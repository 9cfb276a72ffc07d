use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Registration rules: non-empty, long enough, confirmed.
pub fn check_new_password(password: &str, confirm: &str) -> Result<(), AppError> {
    if password.is_empty() || confirm.is_empty() {
        return Err(AppError::validation("password", "password and confirmation are required"));
    }
    if password != confirm {
        return Err(AppError::validation("confirm_password", "passwords do not match"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!("password hashing failed: {e}")
        })
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!("stored password hash is malformed: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let hash = hash_password("demo123").expect("hashing should succeed");
        assert!(verify_password("demo123", &hash).unwrap());
        assert!(!verify_password("demo124", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "plaintext-password").is_err());
    }

    #[test]
    fn new_password_rules() {
        assert!(check_new_password("secret1", "secret1").is_ok());
        assert!(matches!(
            check_new_password("secret1", "secret2"),
            Err(AppError::Validation { field: "confirm_password", .. })
        ));
        assert!(matches!(
            check_new_password("abc", "abc"),
            Err(AppError::Validation { field: "password", .. })
        ));
        assert!(check_new_password("", "").is_err());
    }
}

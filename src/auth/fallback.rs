use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand::RngCore;
use uuid::Uuid;

use super::{sanitize::sanitize_password, AuthProvider};
use crate::{config::FallbackAdminConfig, error::AppError, models::session::AuthTokens};

/// Shared-secret backend used when the identity provider is unreachable or
/// rejects the sign-in. Issues opaque local tokens and no storage credentials.
pub struct StaticCredentialProvider {
    username: String,
    password_hash: String,
}

impl StaticCredentialProvider {
    pub fn new(config: &FallbackAdminConfig) -> Result<Self, AppError> {
        PasswordHash::new(&config.password_hash)
            .map_err(|err| AppError::Config(format!("invalid ADMIN_PASSWORD_HASH: {err}")))?;
        Ok(Self {
            username: config.username.clone(),
            password_hash: config.password_hash.clone(),
        })
    }
}

#[async_trait]
impl AuthProvider for StaticCredentialProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<AuthTokens, AppError> {
        let password = sanitize_password(password)?;
        let parsed = PasswordHash::new(&self.password_hash)
            .map_err(|err| AppError::Config(format!("invalid ADMIN_PASSWORD_HASH: {err}")))?;
        let password_ok = Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok();
        if username != self.username || !password_ok {
            return Err(AppError::Auth("Invalid credentials".into()));
        }

        let nonce = Uuid::new_v4();
        Ok(AuthTokens {
            access_token: format!("static-access-{nonce}"),
            id_token: format!("static-id-{nonce}"),
            refresh_token: format!("static-refresh-{nonce}"),
            issued_by: None,
        })
    }
}

/// Produces an argon2 PHC string suitable for `ADMIN_PASSWORD_HASH`.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|err| AppError::Other(anyhow::anyhow!("salt encoding failed: {err}")))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| AppError::Other(anyhow::anyhow!("password hashing failed: {err}")))?;
    Ok(hash.to_string())
}

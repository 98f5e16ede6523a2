use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tracing::warn;

use crate::{
    error::AppError,
    models::{pin::LocationPin, session::AuthTokens},
};

pub const PINS_CACHE_KEY: &str = "location_pins";
pub const AUTH_TOKENS_KEY: &str = "auth_tokens";

/// Durable client-side key/value store. Every key is one JSON document that is
/// read and written wholesale.
#[derive(Clone)]
pub struct LocalStore {
    root: Arc<PathBuf>,
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root()).await?;
        Ok(())
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root().join(format!("{key}.json"))
    }

    pub async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let path = self.key_path(key);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let raw = fs::read(&path).await?;
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), AppError> {
        self.ensure_structure().await?;
        let data = serde_json::to_vec_pretty(value)?;
        fs::write(self.key_path(key), data).await?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        match fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn load_cached_pins(&self) -> Result<Option<Vec<LocationPin>>, AppError> {
        self.read_json(PINS_CACHE_KEY).await
    }

    pub async fn save_cached_pins(&self, pins: &[LocationPin]) -> Result<(), AppError> {
        self.write_json(PINS_CACHE_KEY, pins).await
    }

    /// A bundle that fails to parse is treated as no session at all.
    pub async fn load_tokens(&self) -> Option<AuthTokens> {
        match self.read_json::<AuthTokens>(AUTH_TOKENS_KEY).await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!("stored token bundle unreadable: {err}");
                None
            }
        }
    }

    pub async fn save_tokens(&self, tokens: &AuthTokens) -> Result<(), AppError> {
        self.write_json(AUTH_TOKENS_KEY, tokens).await
    }

    pub async fn clear_tokens(&self) -> Result<(), AppError> {
        self.remove(AUTH_TOKENS_KEY).await
    }
}

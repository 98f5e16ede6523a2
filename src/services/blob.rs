use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::{error::AppError, models::session::StorageCredentials};

/// Handle to the photo blob store. Holds the temporary credentials installed by
/// the auth adapter; clones share the same slot.
#[derive(Clone, Default)]
pub struct StorageClient {
    credentials: Arc<RwLock<Option<StorageCredentials>>>,
    cdn_domain: Option<Arc<str>>,
}

impl StorageClient {
    pub fn new(cdn_domain: Option<String>) -> Self {
        Self {
            credentials: Arc::default(),
            cdn_domain: cdn_domain.map(Arc::from),
        }
    }

    pub fn install(&self, credentials: StorageCredentials) {
        if let Ok(mut slot) = self.credentials.write() {
            *slot = Some(credentials);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.credentials.write() {
            *slot = None;
        }
    }

    pub fn credentials(&self) -> Option<StorageCredentials> {
        self.credentials.read().ok().and_then(|slot| slot.clone())
    }

    /// Credentials that are present and not past their expiry.
    pub fn require_credentials(&self) -> Result<StorageCredentials, AppError> {
        match self.credentials() {
            Some(creds) if creds.expiration.map_or(true, |exp| exp > Utc::now()) => Ok(creds),
            Some(_) => Err(AppError::Auth(
                "storage credentials expired, sign in again".into(),
            )),
            None => Err(AppError::Auth(
                "storage credentials not configured, sign in with the identity provider".into(),
            )),
        }
    }

    /// Photo `src` as shown to visitors. Rooted paths and absolute URLs are kept;
    /// anything else is a blob-store key.
    pub fn photo_url(&self, src: &str) -> String {
        if src.starts_with('/') || src.contains("://") {
            return src.to_string();
        }
        self.public_url(src)
    }

    /// Public URL for an object key, served through the CDN when one is configured.
    pub fn public_url(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        match self.cdn_domain.as_deref() {
            Some(domain) => format!("{domain}/{key}"),
            None => format!("/{key}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn creds(expiration: Option<chrono::DateTime<Utc>>) -> StorageCredentials {
        StorageCredentials {
            identity_id: "us-west-2:abc".into(),
            access_key_id: "AKIA".into(),
            secret_key: "secret".into(),
            session_token: "session".into(),
            expiration,
        }
    }

    #[test]
    fn clones_share_installed_credentials() {
        let client = StorageClient::new(None);
        let other = client.clone();
        assert!(other.require_credentials().is_err());

        client.install(creds(Some(Utc::now() + Duration::hours(1))));
        assert!(other.require_credentials().is_ok());

        other.clear();
        assert!(client.credentials().is_none());
    }

    #[test]
    fn expired_credentials_are_refused() {
        let client = StorageClient::new(None);
        client.install(creds(Some(Utc::now() - Duration::minutes(5))));
        assert!(matches!(client.require_credentials(), Err(AppError::Auth(_))));
    }

    #[test]
    fn public_url_uses_cdn() {
        let client = StorageClient::new(Some("https://cdn.example.net".into()));
        assert_eq!(
            client.public_url("/trips/dv-1.jpg"),
            "https://cdn.example.net/trips/dv-1.jpg"
        );
        assert_eq!(StorageClient::new(None).public_url("a.jpg"), "/a.jpg");
    }

    #[test]
    fn photo_url_keeps_bundled_assets() {
        let client = StorageClient::new(Some("https://cdn.example.net".into()));
        assert_eq!(client.photo_url("/assets/dunes.jpg"), "/assets/dunes.jpg");
        assert_eq!(
            client.photo_url("https://elsewhere.example/x.jpg"),
            "https://elsewhere.example/x.jpg"
        );
        assert_eq!(
            client.photo_url("photos/dv-1.jpg"),
            "https://cdn.example.net/photos/dv-1.jpg"
        );
    }
}

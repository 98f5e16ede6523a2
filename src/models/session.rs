use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token bundle persisted under the session key of the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Name of the provider that issued the bundle; only that provider is asked
    /// to sign it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_by: Option<String>,
}

impl AuthTokens {
    pub fn has_access_token(&self) -> bool {
        !self.access_token.is_empty()
    }
}

/// Temporary blob-store credentials obtained through the federated identity exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub identity_id: String,
    pub access_key_id: String,
    pub secret_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

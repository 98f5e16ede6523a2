//! Managed identity backend speaking the Cognito user pool / identity pool JSON protocol.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use super::{sanitize::sanitize_password, AuthProvider};
use crate::{
    config::IdentityConfig,
    error::AppError,
    models::session::{AuthTokens, StorageCredentials},
};

const IDP_SERVICE: &str = "AWSCognitoIdentityProviderService";
const IDENTITY_SERVICE: &str = "AWSCognitoIdentityService";
const AMZ_JSON: &str = "application/x-amz-json-1.1";

pub struct ManagedIdentityProvider {
    client: Client,
    config: IdentityConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthRequest<'a> {
    auth_flow: &'static str,
    client_id: &'a str,
    auth_parameters: HashMap<&'static str, &'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    challenge_name: Option<String>,
    authentication_result: Option<AuthenticationResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    #[serde(default)]
    id_token: String,
    #[serde(default)]
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GlobalSignOutRequest<'a> {
    access_token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetIdRequest<'a> {
    identity_pool_id: &'a str,
    logins: HashMap<String, &'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetIdResponse {
    identity_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetCredentialsRequest<'a> {
    identity_id: &'a str,
    logins: HashMap<String, &'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct GetCredentialsResponse {
    credentials: Option<RawCredentials>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawCredentials {
    access_key_id: Option<String>,
    secret_key: Option<String>,
    session_token: Option<String>,
    expiration: Option<f64>,
}

#[derive(Deserialize)]
struct ServiceError {
    #[serde(rename = "__type", default)]
    kind: String,
    #[serde(alias = "Message", default)]
    message: String,
}

impl ManagedIdentityProvider {
    pub fn new(client: Client, config: IdentityConfig) -> Self {
        Self { client, config }
    }

    async fn call<Req, Resp>(&self, endpoint: &str, target: &str, body: &Req) -> Result<Resp, AppError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(endpoint)
            .header("X-Amz-Target", target)
            .header(reqwest::header::CONTENT_TYPE, AMZ_JSON)
            .body(serde_json::to_vec(body)?)
            .send()
            .await
            .map_err(|err| AppError::network(format!("identity backend unreachable: {err}")))?;

        let status = response.status();
        let raw = response
            .bytes()
            .await
            .map_err(|err| AppError::network(format!("identity backend read failed: {err}")))?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ServiceError>(&raw)
                .map(|err| {
                    let kind = err.kind.rsplit('#').next().unwrap_or_default().to_string();
                    match (kind.is_empty(), err.message.is_empty()) {
                        (false, false) => format!("{kind}: {}", err.message),
                        (false, true) => kind,
                        _ => err.message,
                    }
                })
                .unwrap_or_default();
            let detail = if detail.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                detail
            };
            return Err(AppError::Auth(detail));
        }

        Ok(serde_json::from_slice(&raw)?)
    }

    fn logins<'a>(&self, id_token: &'a str) -> HashMap<String, &'a str> {
        HashMap::from([(self.config.login_provider(), id_token)])
    }
}

#[async_trait]
impl AuthProvider for ManagedIdentityProvider {
    fn name(&self) -> &'static str {
        "managed"
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<AuthTokens, AppError> {
        let password = sanitize_password(password)?;
        let request = InitiateAuthRequest {
            auth_flow: "USER_PASSWORD_AUTH",
            client_id: &self.config.client_id,
            auth_parameters: HashMap::from([("USERNAME", username), ("PASSWORD", password)]),
        };
        let response: InitiateAuthResponse = self
            .call(
                &self.config.idp_endpoint,
                &format!("{IDP_SERVICE}.InitiateAuth"),
                &request,
            )
            .await?;

        if response.challenge_name.as_deref() == Some("NEW_PASSWORD_REQUIRED") {
            return Err(AppError::Auth(
                "Password change required. Please contact administrator.".into(),
            ));
        }

        let Some(result) = response.authentication_result else {
            return Err(AppError::Auth("Authentication failed".into()));
        };
        Ok(AuthTokens {
            access_token: result.access_token,
            id_token: result.id_token,
            refresh_token: result.refresh_token,
            issued_by: None,
        })
    }

    async fn sign_out(&self, tokens: &AuthTokens) -> Result<(), AppError> {
        if !tokens.has_access_token() {
            return Ok(());
        }
        let _: serde_json::Value = self
            .call(
                &self.config.idp_endpoint,
                &format!("{IDP_SERVICE}.GlobalSignOut"),
                &GlobalSignOutRequest {
                    access_token: &tokens.access_token,
                },
            )
            .await?;
        Ok(())
    }

    async fn exchange_credentials(
        &self,
        id_token: &str,
    ) -> Result<Option<StorageCredentials>, AppError> {
        let Some(pool_id) = self.config.identity_pool_id.as_deref() else {
            debug!("no identity pool configured, skipping credential exchange");
            return Ok(None);
        };

        let id: GetIdResponse = self
            .call(
                &self.config.identity_endpoint,
                &format!("{IDENTITY_SERVICE}.GetId"),
                &GetIdRequest {
                    identity_pool_id: pool_id,
                    logins: self.logins(id_token),
                },
            )
            .await?;
        let identity_id = id
            .identity_id
            .ok_or_else(|| AppError::Auth("Failed to get Identity ID".into()))?;
        info!(%identity_id, "resolved federated identity");

        let creds: GetCredentialsResponse = self
            .call(
                &self.config.identity_endpoint,
                &format!("{IDENTITY_SERVICE}.GetCredentialsForIdentity"),
                &GetCredentialsRequest {
                    identity_id: &identity_id,
                    logins: self.logins(id_token),
                },
            )
            .await?;

        let missing = || AppError::Auth("Failed to get storage credentials".into());
        let raw = creds.credentials.ok_or_else(missing)?;
        Ok(Some(StorageCredentials {
            identity_id,
            access_key_id: raw.access_key_id.ok_or_else(missing)?,
            secret_key: raw.secret_key.ok_or_else(missing)?,
            session_token: raw.session_token.ok_or_else(missing)?,
            expiration: raw
                .expiration
                .and_then(|secs| DateTime::from_timestamp(secs as i64, 0)),
        }))
    }
}

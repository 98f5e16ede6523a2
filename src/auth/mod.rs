pub mod fallback;
pub mod managed;
pub mod sanitize;

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use tracing::{error, info, warn};

use crate::{
    config::AppConfig,
    error::AppError,
    models::session::{AuthTokens, StorageCredentials},
    services::{blob::StorageClient, storage::LocalStore},
};

pub use fallback::StaticCredentialProvider;
pub use managed::ManagedIdentityProvider;
pub use sanitize::sanitize_username;

/// Private cookie carrying the caller's access token on the host surface.
pub const SESSION_COOKIE: &str = "portfolio_session";

/// One identity backend. The adapter tries its providers in registration order.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// `username` has already been through [`sanitize_username`].
    async fn sign_in(&self, username: &str, password: &str) -> Result<AuthTokens, AppError>;

    async fn sign_out(&self, _tokens: &AuthTokens) -> Result<(), AppError> {
        Ok(())
    }

    /// Trades an identity token for temporary blob-store credentials. Backends
    /// without a federated identity pool return `Ok(None)`.
    async fn exchange_credentials(
        &self,
        _id_token: &str,
    ) -> Result<Option<StorageCredentials>, AppError> {
        Ok(None)
    }
}

/// Managed identity first when configured, then the static admin account.
pub fn providers_from_config(
    config: &AppConfig,
    client: &Client,
) -> Result<Vec<Arc<dyn AuthProvider>>, AppError> {
    let mut providers: Vec<Arc<dyn AuthProvider>> = Vec::new();
    if let Some(identity) = &config.identity {
        providers.push(Arc::new(ManagedIdentityProvider::new(
            client.clone(),
            identity.clone(),
        )));
    }
    if let Some(admin) = &config.fallback_admin {
        providers.push(Arc::new(StaticCredentialProvider::new(admin)?));
    }
    if providers.is_empty() {
        warn!("no identity provider configured; admin sign-in is disabled");
    }
    Ok(providers)
}

#[derive(Debug)]
pub struct SignInResult {
    pub success: bool,
    pub tokens: Option<AuthTokens>,
    pub error: Option<AppError>,
    /// Set when sign-in worked but blob-store credentials could not be obtained.
    pub warning: Option<String>,
    pub provider: Option<&'static str>,
}

impl SignInResult {
    fn succeeded(provider: &'static str, tokens: AuthTokens, warning: Option<String>) -> Self {
        Self {
            success: true,
            tokens: Some(tokens),
            error: None,
            warning,
            provider: Some(provider),
        }
    }

    fn failed(error: AppError) -> Self {
        Self {
            success: false,
            tokens: None,
            error: Some(error),
            warning: None,
            provider: None,
        }
    }
}

#[derive(Clone)]
pub struct AuthAdapter {
    providers: Arc<Vec<Arc<dyn AuthProvider>>>,
    store: LocalStore,
    storage_client: StorageClient,
}

impl AuthAdapter {
    pub fn new(
        providers: Vec<Arc<dyn AuthProvider>>,
        store: LocalStore,
        storage_client: StorageClient,
    ) -> Self {
        Self {
            providers: Arc::new(providers),
            store,
            storage_client,
        }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn storage_client(&self) -> &StorageClient {
        &self.storage_client
    }

    /// Never returns an error directly; every failure lands in [`SignInResult::error`].
    pub async fn sign_in(&self, username: &str, password: &str) -> SignInResult {
        let username = match sanitize_username(username) {
            Ok(username) => username,
            Err(err) => return SignInResult::failed(err),
        };

        let mut last_error = None;
        for provider in self.providers.iter() {
            let mut tokens = match provider.sign_in(&username, password).await {
                Ok(tokens) => tokens,
                Err(err) => {
                    warn!(provider = provider.name(), "sign-in failed: {err}");
                    last_error = Some(err);
                    continue;
                }
            };

            tokens.issued_by = Some(provider.name().to_string());
            if let Err(err) = self.store.save_tokens(&tokens).await {
                error!("could not persist session tokens: {err}");
                return SignInResult::failed(err);
            }
            let warning = self.install_storage_credentials(provider.as_ref(), &tokens).await;
            info!(provider = provider.name(), "signed in");
            return SignInResult::succeeded(provider.name(), tokens, warning);
        }

        SignInResult::failed(
            last_error.unwrap_or_else(|| AppError::Auth("no identity provider configured".into())),
        )
    }

    async fn install_storage_credentials(
        &self,
        provider: &dyn AuthProvider,
        tokens: &AuthTokens,
    ) -> Option<String> {
        self.storage_client.clear();
        match provider.exchange_credentials(&tokens.id_token).await {
            Ok(Some(creds)) => {
                self.storage_client.install(creds);
                None
            }
            Ok(None) => Some(format!(
                "signed in via {} without storage credentials; photo uploads are unavailable",
                provider.name()
            )),
            Err(err) => {
                warn!(provider = provider.name(), "credential exchange failed: {err}");
                Some(format!(
                    "storage credentials unavailable ({err}); sign in again before uploading"
                ))
            }
        }
    }

    pub async fn sign_out(&self) {
        if let Some(tokens) = self.store.load_tokens().await {
            // Bundles written before the issuer was recorded go to every provider.
            let issuers = self.providers.iter().filter(|provider| {
                tokens
                    .issued_by
                    .as_deref()
                    .map_or(true, |issuer| issuer == provider.name())
            });
            for provider in issuers {
                if let Err(err) = provider.sign_out(&tokens).await {
                    warn!(provider = provider.name(), "sign-out failed: {err}");
                }
            }
        }
        if let Err(err) = self.store.clear_tokens().await {
            error!("could not clear session tokens: {err}");
        }
        self.storage_client.clear();
    }

    pub async fn stored_tokens(&self) -> Option<AuthTokens> {
        self.store.load_tokens().await
    }

    /// Presence check only; an expired token is discovered when a call fails.
    pub async fn is_authenticated(&self) -> bool {
        self.stored_tokens()
            .await
            .is_some_and(|tokens| tokens.has_access_token())
    }

    /// True when `access_token` is the one in the stored bundle.
    pub async fn owns_session(&self, access_token: &str) -> bool {
        !access_token.is_empty()
            && self
                .stored_tokens()
                .await
                .is_some_and(|tokens| tokens.access_token == access_token)
    }

    pub async fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let Some(tokens) = self.stored_tokens().await else {
            return headers;
        };
        if !tokens.has_access_token() {
            return headers;
        }
        match HeaderValue::from_str(&format!("Bearer {}", tokens.access_token)) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(err) => warn!("stored access token is not a valid header value: {err}"),
        }
        headers
    }
}

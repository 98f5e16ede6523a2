use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    auth::{self, AuthAdapter},
    config::AppConfig,
    error::AppError,
    services::{
        blob::StorageClient, gallery::GalleryFeed, gateway, gateway::RemoteGateway,
        pin_store::PinStore, storage::LocalStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<PinStore>,
    pub auth: AuthAdapter,
    pub gallery: Arc<GalleryFeed>,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<PinStore>, auth: AuthAdapter) -> Self {
        let gallery = Arc::new(GalleryFeed::attach(
            &store,
            auth.storage_client().clone(),
        ));
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        Self {
            config,
            store,
            auth,
            gallery,
            cookie_key,
        }
    }

    /// Wires the local store, identity providers, gateway and pin store from
    /// configuration. Nothing is fetched yet.
    pub async fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let local = LocalStore::new(config.data_dir.clone());
        local.ensure_structure().await?;

        let client = gateway::http_client(config.http_timeout)?;
        let providers = auth::providers_from_config(&config, &client)?;
        let storage_client = StorageClient::new(config.photo_cdn_domain.clone());
        let adapter = AuthAdapter::new(providers, local.clone(), storage_client);

        let remote = RemoteGateway::new(client, config.api_base_url.clone(), adapter.clone());
        let store = Arc::new(PinStore::new(remote, local)?);
        Ok(Self::new(config, store, adapter))
    }

    /// Loads the pin set once so the gallery has content before the first publish.
    pub async fn warm_up(&self) -> usize {
        let pins = self.store.get_all_pins().await;
        self.gallery.refresh(&pins);
        pins.len()
    }

    pub fn shutdown(&self) {
        self.gallery.detach();
        self.store.close();
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

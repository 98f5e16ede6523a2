#![allow(dead_code)]

use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::Router;
use portfolio::{
    auth::{AuthAdapter, AuthProvider},
    models::{
        pin::{Coordinates, LocationPin, PinCategory},
        session::AuthTokens,
        trip::{LocationPhoto, Trip},
    },
    routes::locations_router,
    services::{
        blob::StorageClient,
        gateway::{http_client, RemoteGateway},
        locations::LocationRepository,
        pin_store::PinStore,
        storage::LocalStore,
    },
};
use tokio::net::TcpListener;

/// Nothing listens here, so every request fails at connect time.
pub const UNREACHABLE: &str = "http://127.0.0.1:1";

pub async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .expect("serve test app");
    });
    format!("http://{addr}")
}

pub async fn spawn_locations_api(db_dir: &Path) -> String {
    let repo = LocationRepository::open(db_dir.join("locations.json"))
        .await
        .expect("open repository");
    spawn(locations_router(repo, &[])).await
}

pub fn adapter(root: &Path, providers: Vec<Arc<dyn AuthProvider>>) -> (AuthAdapter, LocalStore) {
    let local = LocalStore::new(root.to_path_buf());
    let adapter = AuthAdapter::new(providers, local.clone(), StorageClient::default());
    (adapter, local)
}

/// Store whose gateway already carries a bearer token.
pub async fn signed_in_store(base_url: &str, root: &Path) -> PinStore {
    let (adapter, local) = adapter(root, Vec::new());
    local
        .save_tokens(&AuthTokens {
            access_token: "test-access".into(),
            id_token: "test-id".into(),
            refresh_token: "test-refresh".into(),
            issued_by: None,
        })
        .await
        .expect("save tokens");
    let client = http_client(Duration::from_secs(5)).expect("http client");
    PinStore::new(RemoteGateway::new(client, base_url, adapter), local).expect("pin store")
}

pub fn sample_pin(id: &str, title: &str) -> LocationPin {
    let mut pin = LocationPin::new(
        id,
        title,
        Coordinates {
            latitude: 44.4280,
            longitude: -110.5885,
        },
        PinCategory::Mountains,
    );
    pin.description = "Geysers and high meadows".into();
    let mut trip = Trip::new(format!("{id}-trip-1"), title);
    trip.story = "Two cold mornings at the basin.".into();
    trip.visit_date = "2023-09-14".into();
    trip.photos.push(LocationPhoto {
        id: format!("{id}-photo-1"),
        src: "/assets/basin.jpg".into(),
        alt: "Steam over the basin".into(),
        title: "Basin".into(),
        description: None,
        category: None,
    });
    pin.trips.push(trip);
    pin
}

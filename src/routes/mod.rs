pub mod admin;
pub mod locations;
pub mod public;

use axum::{http::HeaderValue, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

use crate::{services::locations::LocationRepository, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    let assets = ServeDir::new(state.config.assets_dir.clone());
    Router::new()
        .merge(public::router())
        .nest_service("/assets", assets)
        .nest("/admin", admin::router())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub fn locations_router(repo: LocationRepository, allowed_origins: &[String]) -> Router {
    locations::router()
        .with_state(repo)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// No configured origins means any origin may call.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, "ignoring invalid CORS origin: {err}");
                None
            }
        })
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

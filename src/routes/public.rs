use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::AppError,
    models::{
        gallery::{GalleryCategory, GalleryImage},
        pin::{Coordinates, LocationPin, PinCategory},
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/pins", get(list_pins))
        .route("/api/pins/featured", get(featured_pins))
        .route("/api/pins/:id", get(pin_detail))
        .route("/api/gallery", get(gallery))
        .route("/api/gallery/categories", get(gallery_categories))
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "pinsLoaded": state.store.is_loaded(),
        "providers": state.auth.provider_names(),
    }))
}

async fn load_pins(state: &AppState) -> Vec<LocationPin> {
    let pins = state.store.get_all_pins().await;
    state.gallery.refresh(&pins);
    pins
}

async fn list_pins(State(state): State<AppState>) -> Json<Vec<LocationPin>> {
    Json(load_pins(&state).await)
}

/// Card shown for a featured location on the landing page.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeaturedPin<'a> {
    id: &'a str,
    title: &'a str,
    category: PinCategory,
    coordinates: Coordinates,
    story: &'a str,
    trip_count: usize,
    photo_count: usize,
}

impl<'a> From<&'a LocationPin> for FeaturedPin<'a> {
    fn from(pin: &'a LocationPin) -> Self {
        Self {
            id: &pin.id,
            title: &pin.title,
            category: pin.category,
            coordinates: pin.coordinates,
            story: pin.display_story(),
            trip_count: pin.trips.len(),
            photo_count: pin.photo_count(),
        }
    }
}

async fn featured_pins(State(state): State<AppState>) -> impl IntoResponse {
    let pins = load_pins(&state).await;
    let featured: Vec<FeaturedPin<'_>> = pins
        .iter()
        .filter(|pin| pin.featured)
        .map(FeaturedPin::from)
        .collect();
    Json(json!(featured))
}

async fn pin_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LocationPin>, AppError> {
    state
        .store
        .get_pin(&id)
        .await
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[derive(Deserialize)]
struct GalleryQuery {
    category: Option<String>,
}

async fn gallery(
    State(state): State<AppState>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<Vec<GalleryImage>>, AppError> {
    let category = match query.category.as_deref().map(str::trim) {
        None | Some("") => GalleryCategory::All,
        Some(label) => GalleryCategory::from_label(label)
            .ok_or_else(|| AppError::Validation(format!("unknown gallery category: {label}")))?,
    };
    if !state.store.is_loaded() {
        load_pins(&state).await;
    }
    Ok(Json(state.gallery.images(category)))
}

async fn gallery_categories() -> Json<Vec<&'static str>> {
    Json(GalleryCategory::ALL.iter().map(GalleryCategory::label).collect())
}

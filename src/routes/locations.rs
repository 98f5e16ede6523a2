use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::{error::AppError, models::pin::LocationPin, services::locations::LocationRepository};

pub fn router() -> Router<LocationRepository> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/:id",
            get(get_location)
                .put(update_location)
                .delete(delete_location),
        )
}

/// Bearer token presence check for write endpoints. Validating the token is the
/// identity backend's job.
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| Self(token.to_string()))
            .ok_or(AppError::Unauthorized)
    }
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_locations(State(repo): State<LocationRepository>) -> Json<Vec<LocationPin>> {
    Json(repo.list().await)
}

async fn get_location(
    State(repo): State<LocationRepository>,
    Path(id): Path<String>,
) -> Result<Json<LocationPin>, AppError> {
    Ok(Json(repo.get(&id).await?))
}

async fn create_location(
    State(repo): State<LocationRepository>,
    _token: BearerToken,
    Json(pin): Json<LocationPin>,
) -> Result<(StatusCode, Json<LocationPin>), AppError> {
    let created = repo.create(pin).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_location(
    State(repo): State<LocationRepository>,
    _token: BearerToken,
    Path(id): Path<String>,
    Json(pin): Json<LocationPin>,
) -> Result<Json<LocationPin>, AppError> {
    Ok(Json(repo.update(&id, pin).await?))
}

async fn delete_location(
    State(repo): State<LocationRepository>,
    _token: BearerToken,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    repo.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::{sanitize_username, SESSION_COOKIE},
    error::AppError,
    models::pin::{is_placeholder_id, LocationPin},
    services::pin_store::{MutationFailureKind, MutationOutcome, MutationResult, PinStore},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session))
        .route("/pins", post(create_pin))
        .route("/pins/new-id", get(new_pin_id))
        .route("/pins/:id", put(update_pin).delete(delete_pin))
}

/// The request carries the session cookie issued at login, and its token is
/// still the stored one.
pub struct AdminSession;

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Err(AppError::Unauthorized);
        };
        if state.auth.owns_session(cookie.value()).await {
            Ok(AdminSession)
        } else {
            Err(AppError::Unauthorized)
        }
    }
}

fn session_cookie(access_token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, access_token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    provider: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(PrivateCookieJar, Json<LoginResponse>), AppError> {
    let username = sanitize_username(&request.username)?;
    let result = state.auth.sign_in(&username, &request.password).await;
    match (result.success, result.provider, result.tokens) {
        (true, Some(provider), Some(tokens)) => Ok((
            jar.add(session_cookie(tokens.access_token)),
            Json(LoginResponse {
                provider,
                warning: result.warning,
            }),
        )),
        _ => Err(result.error.unwrap_or(AppError::Unauthorized)),
    }
}

async fn logout(
    State(state): State<AppState>,
    _session: AdminSession,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, StatusCode) {
    state.auth.sign_out().await;
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}

async fn session(
    State(state): State<AppState>,
    session: Option<AdminSession>,
) -> impl IntoResponse {
    let storage = state.auth.storage_client().require_credentials();
    Json(json!({
        "authenticated": session.is_some(),
        "storageCredentials": storage.is_ok(),
        "storageWarning": storage.err().map(|err| err.to_string()),
    }))
}

async fn new_pin_id(_session: AdminSession) -> impl IntoResponse {
    Json(json!({ "id": PinStore::generate_id() }))
}

async fn create_pin(
    State(state): State<AppState>,
    _session: AdminSession,
    Json(mut pin): Json<LocationPin>,
) -> Response {
    if !is_placeholder_id(&pin.id) {
        pin.id = PinStore::generate_id();
    }
    let result = state.store.save_pin(pin).await;
    mutation_response(result, |created| (StatusCode::CREATED, Json(created)).into_response())
}

async fn update_pin(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<String>,
    Json(mut pin): Json<LocationPin>,
) -> Response {
    pin.id = id;
    let result = state.store.update_pin(pin).await;
    mutation_response(result, |()| StatusCode::NO_CONTENT.into_response())
}

async fn delete_pin(
    State(state): State<AppState>,
    _session: AdminSession,
    Path(id): Path<String>,
) -> Response {
    let result = state.store.delete_pin(&id).await;
    mutation_response(result, |()| StatusCode::NO_CONTENT.into_response())
}

/// A degraded mutation still reports the pin set every subscriber was handed.
fn mutation_response<T>(
    result: MutationResult<T>,
    committed: impl FnOnce(T) -> Response,
) -> Response {
    let err = match result.outcome {
        MutationOutcome::Committed(value) => return committed(value),
        MutationOutcome::Degraded(err) => err,
    };
    let kind = MutationFailureKind::classify(&err);
    let status = match kind {
        MutationFailureKind::SavedLocally => StatusCode::BAD_GATEWAY,
        MutationFailureKind::Rejected => err.status_code(),
    };
    (
        status,
        Json(json!({
            "outcome": kind.as_str(),
            "error": err.to_string(),
            "pins": result.snapshot,
        })),
    )
        .into_response()
}

mod common;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Bytes,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use portfolio::{
    auth::{AuthProvider, ManagedIdentityProvider},
    config::IdentityConfig,
    error::AppError,
    services::gateway::http_client,
};
use serde_json::{json, Value};
use tempfile::TempDir;

use common::{spawn, UNREACHABLE};

const POOL: &str = "us-west-2_portfolio";
const LOGIN_KEY: &str = "cognito-idp.us-west-2.amazonaws.com/us-west-2_portfolio";

type Calls = Arc<Mutex<Vec<String>>>;

/// Stands in for both Cognito endpoints, dispatching on `X-Amz-Target`.
async fn cognito(calls: Calls, headers: HeaderMap, body: Bytes) -> Response {
    let target = headers
        .get("x-amz-target")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body: Value = serde_json::from_slice(&body).unwrap_or_default();
    calls.lock().unwrap().push(target.clone());

    match target.rsplit('.').next().unwrap_or_default() {
        "InitiateAuth" => {
            let params = &body["AuthParameters"];
            match (params["USERNAME"].as_str(), params["PASSWORD"].as_str()) {
                (Some("fresh"), _) => {
                    Json(json!({ "ChallengeName": "NEW_PASSWORD_REQUIRED", "Session": "s" }))
                        .into_response()
                }
                (Some("curator"), Some("aperture-f8")) => Json(json!({
                    "AuthenticationResult": {
                        "AccessToken": "access-1",
                        "IdToken": "id-1",
                        "RefreshToken": "refresh-1"
                    }
                }))
                .into_response(),
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({
                        "__type": "NotAuthorizedException",
                        "message": "Incorrect username or password."
                    })),
                )
                    .into_response(),
            }
        }
        "GetId" if body["Logins"][LOGIN_KEY] == "id-1" => {
            Json(json!({ "IdentityId": "us-west-2:identity-1" })).into_response()
        }
        "GetCredentialsForIdentity" if body["IdentityId"] == "us-west-2:identity-1" => {
            Json(json!({
                "IdentityId": "us-west-2:identity-1",
                "Credentials": {
                    "AccessKeyId": "AKIA-TEST",
                    "SecretKey": "secret",
                    "SessionToken": "session",
                    "Expiration": 1.9e9
                }
            }))
            .into_response()
        }
        "GlobalSignOut" => Json(json!({})).into_response(),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "__type": "InvalidParameterException", "message": target })),
        )
            .into_response(),
    }
}

async fn provider(identity_pool: bool) -> (ManagedIdentityProvider, Calls) {
    let calls: Calls = Arc::default();
    let recorded = Arc::clone(&calls);
    let app = Router::new().route(
        "/",
        post(move |headers: HeaderMap, body: Bytes| cognito(recorded.clone(), headers, body)),
    );
    let endpoint = format!("{}/", spawn(app).await);
    let config = IdentityConfig {
        region: "us-west-2".into(),
        user_pool_id: POOL.into(),
        client_id: "portfolio-client".into(),
        identity_pool_id: identity_pool.then(|| "us-west-2:pool".to_string()),
        idp_endpoint: endpoint.clone(),
        identity_endpoint: endpoint,
    };
    let client = http_client(Duration::from_secs(5)).unwrap();
    (ManagedIdentityProvider::new(client, config), calls)
}

#[tokio::test]
async fn password_sign_in_returns_the_token_bundle() {
    let (provider, calls) = provider(true).await;

    let tokens = provider.sign_in("curator", "aperture-f8").await.unwrap();
    assert_eq!(tokens.access_token, "access-1");
    assert_eq!(tokens.id_token, "id-1");
    assert_eq!(tokens.refresh_token, "refresh-1");
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["AWSCognitoIdentityProviderService.InitiateAuth"]
    );
}

#[tokio::test]
async fn rejected_password_surfaces_the_service_message() {
    let (provider, _) = provider(true).await;

    let err = provider.sign_in("curator", "wrong").await.unwrap_err();
    match err {
        AppError::Auth(message) => {
            assert!(message.starts_with("NotAuthorizedException"));
            assert!(message.contains("Incorrect username or password."));
        }
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn new_password_challenge_is_an_auth_error() {
    let (provider, _) = provider(true).await;

    let err = provider.sign_in("fresh", "temporary-1").await.unwrap_err();
    assert!(matches!(err, AppError::Auth(ref message) if message.contains("Password change required")));
}

#[tokio::test]
async fn id_token_is_exchanged_for_storage_credentials() {
    let (provider, calls) = provider(true).await;

    let creds = provider
        .exchange_credentials("id-1")
        .await
        .unwrap()
        .expect("credentials");
    assert_eq!(creds.identity_id, "us-west-2:identity-1");
    assert_eq!(creds.access_key_id, "AKIA-TEST");
    assert_eq!(creds.session_token, "session");
    assert_eq!(creds.expiration.map(|at| at.timestamp()), Some(1_900_000_000));
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "AWSCognitoIdentityService.GetId",
            "AWSCognitoIdentityService.GetCredentialsForIdentity",
        ]
    );
}

#[tokio::test]
async fn exchange_is_skipped_without_identity_pool() {
    let (provider, calls) = provider(false).await;

    assert!(provider.exchange_credentials("id-1").await.unwrap().is_none());
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn adapter_sign_in_installs_storage_credentials() {
    let root = TempDir::new().unwrap();
    let (provider, calls) = provider(true).await;
    let (adapter, _) = common::adapter(root.path(), vec![Arc::new(provider)]);

    let result = adapter.sign_in("cura\u{200B}tor ", "aperture-f8").await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.provider, Some("managed"));
    assert!(result.warning.is_none());
    assert!(adapter.storage_client().require_credentials().is_ok());

    adapter.sign_out().await;
    assert!(!adapter.is_authenticated().await);
    assert!(adapter.storage_client().credentials().is_none());
    assert_eq!(
        calls.lock().unwrap().last().map(String::as_str),
        Some("AWSCognitoIdentityProviderService.GlobalSignOut")
    );
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let config = IdentityConfig {
        region: "us-west-2".into(),
        user_pool_id: POOL.into(),
        client_id: "portfolio-client".into(),
        identity_pool_id: None,
        idp_endpoint: format!("{UNREACHABLE}/"),
        identity_endpoint: format!("{UNREACHABLE}/"),
    };
    let provider = ManagedIdentityProvider::new(http_client(Duration::from_secs(5)).unwrap(), config);

    let err = provider.sign_in("curator", "aperture-f8").await.unwrap_err();
    assert!(matches!(err, AppError::Network { status: None, .. }));
}

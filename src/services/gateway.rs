use std::{sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderValue, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{auth::AuthAdapter, error::AppError};

pub const PINS_ENDPOINT: &str = "/locations";

pub fn pin_endpoint(id: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
    format!("{PINS_ENDPOINT}/{}", encoded.replace('+', "%20"))
}

pub fn http_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(60))
        .timeout(timeout)
        .build()
        .map_err(|err| AppError::Other(anyhow::anyhow!("failed to create HTTP client: {err}")))
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

/// Uniform outcome of a gateway call. Transport errors and non-2xx answers both
/// end up here as `success == false`.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub success: bool,
    pub status: Option<u16>,
    pub data: Option<ResponseBody>,
    pub error: Option<String>,
}

impl GatewayResponse {
    fn ok(status: u16, data: Option<ResponseBody>) -> Self {
        Self {
            success: true,
            status: Some(status),
            data,
            error: None,
        }
    }

    fn failed(status: Option<u16>, error: String) -> Self {
        Self {
            success: false,
            status,
            data: None,
            error: Some(error),
        }
    }

    pub fn into_result(self) -> Result<Option<ResponseBody>, AppError> {
        if self.success {
            return Ok(self.data);
        }
        let message = self.error.unwrap_or_else(|| "Request failed".into());
        Err(match self.status {
            Some(status) => AppError::from_status(status, message),
            None => AppError::network(message),
        })
    }
}

#[derive(Clone)]
pub struct RemoteGateway {
    client: Client,
    base_url: Arc<str>,
    auth: AuthAdapter,
}

impl RemoteGateway {
    pub fn new(client: Client, base_url: impl Into<String>, auth: AuthAdapter) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            auth,
        }
    }

    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
        require_auth: bool,
    ) -> GatewayResponse {
        let url = format!("{}{}", self.base_url, endpoint);
        match self.send(&url, method.clone(), body, require_auth).await {
            Ok(response) => response,
            Err(err) => {
                warn!(%method, %url, "request failed: {err}");
                GatewayResponse::failed(None, err.to_string())
            }
        }
    }

    async fn send(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
        require_auth: bool,
    ) -> Result<GatewayResponse, AppError> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if require_auth {
            request = request.headers(self.auth.auth_headers().await);
        }
        if let Some(body) = body.filter(|_| method != Method::GET) {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request
            .send()
            .await
            .map_err(|err| AppError::network(format!("request to {url} failed: {err}")))?;
        let status = response.status();
        debug!(%method, %url, status = status.as_u16(), "gateway response");

        if !status.is_success() {
            let message = format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown Status")
            );
            warn!(%method, %url, "{message}");
            return Ok(GatewayResponse::failed(Some(status.as_u16()), message));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(GatewayResponse::ok(status.as_u16(), None));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.contains("application/json"));
        let text = response
            .text()
            .await
            .map_err(|err| AppError::network(format!("reading response from {url} failed: {err}")))?;
        let data = if is_json {
            ResponseBody::Json(serde_json::from_str(&text)?)
        } else {
            ResponseBody::Text(text)
        };
        Ok(GatewayResponse::ok(status.as_u16(), Some(data)))
    }
}

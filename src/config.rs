use std::{env, net::SocketAddr, path::PathBuf, time::Duration};

use url::Url;

use crate::error::AppError;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://ui.sandbox.local,https://ui.sandbox.local,http://localhost:5173";

#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub region: String,
    pub user_pool_id: String,
    pub client_id: String,
    pub identity_pool_id: Option<String>,
    pub idp_endpoint: String,
    pub identity_endpoint: String,
}

impl IdentityConfig {
    /// Key under which the user pool's id token is presented to the identity pool.
    pub fn login_provider(&self) -> String {
        format!(
            "cognito-idp.{}.amazonaws.com/{}",
            self.region, self.user_pool_id
        )
    }
}

#[derive(Debug, Clone)]
pub struct FallbackAdminConfig {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub api_base_url: String,
    pub data_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub identity: Option<IdentityConfig>,
    pub fallback_admin: Option<FallbackAdminConfig>,
    pub photo_cdn_domain: Option<String>,
    pub allowed_origins: Vec<String>,
    pub http_timeout: Duration,
    pub cookie_secret: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let api_base_url = normalize_base_url(
            non_blank("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        )?;

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let assets_dir = env::var("ASSETS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("assets"));

        let region = non_blank("AWS_REGION").unwrap_or_else(|| "us-west-2".to_string());
        let identity = non_blank("COGNITO_CLIENT_ID").map(|client_id| IdentityConfig {
            idp_endpoint: non_blank("COGNITO_IDP_ENDPOINT")
                .unwrap_or_else(|| format!("https://cognito-idp.{region}.amazonaws.com/")),
            identity_endpoint: non_blank("COGNITO_IDENTITY_ENDPOINT")
                .unwrap_or_else(|| format!("https://cognito-identity.{region}.amazonaws.com/")),
            user_pool_id: non_blank("COGNITO_USER_POOL_ID").unwrap_or_default(),
            identity_pool_id: non_blank("COGNITO_IDENTITY_POOL_ID"),
            client_id,
            region: region.clone(),
        });

        let fallback_admin = non_blank("ADMIN_PASSWORD_HASH").map(|password_hash| {
            FallbackAdminConfig {
                username: non_blank("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
                password_hash,
            }
        });

        let http_timeout = match non_blank("HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .map_err(|err| AppError::Config(format!("invalid HTTP_TIMEOUT_SECS: {err}")))?,
            ),
            None => Duration::from_secs(30),
        };

        Ok(Self {
            listen_addr,
            api_base_url,
            data_dir,
            assets_dir,
            identity,
            fallback_admin,
            photo_cdn_domain: non_blank("PHOTO_CDN_DOMAIN")
                .map(|domain| domain.trim_end_matches('/').to_string()),
            allowed_origins: allowed_origins_from_env(),
            http_timeout,
            cookie_secret: env::var("COOKIE_SECRET")
                .unwrap_or_else(|_| "change-me-portfolio-session-cookie-secret".to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LocationsConfig {
    pub listen_addr: SocketAddr,
    pub db_path: PathBuf,
    pub allowed_origins: Vec<String>,
}

impl LocationsConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let listen_addr: SocketAddr = env::var("LOCATIONS_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid LOCATIONS_LISTEN_ADDR: {err}")))?;
        let db_path = env::var("LOCATIONS_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("locations.json"));

        Ok(Self {
            listen_addr,
            db_path,
            allowed_origins: allowed_origins_from_env(),
        })
    }
}

/// Blank values count as unset, so an empty override falls back to the default.
fn non_blank(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn allowed_origins_from_env() -> Vec<String> {
    parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.into()))
}

pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn normalize_base_url(raw: String) -> Result<String, AppError> {
    let trimmed = raw.trim().trim_end_matches('/').to_string();
    Url::parse(&trimmed)
        .map_err(|err| AppError::Config(format!("invalid API_BASE_URL {trimmed:?}: {err}")))?;
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_loses_trailing_slash() {
        let url = normalize_base_url(" https://api.example.com/staging_api/ ".into()).unwrap();
        assert_eq!(url, "https://api.example.com/staging_api");
    }

    #[test]
    fn base_url_must_parse() {
        assert!(matches!(
            normalize_base_url("not a url".into()),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn origins_skip_blanks() {
        assert_eq!(
            parse_origins("http://a.local, ,https://b.local,"),
            vec!["http://a.local".to_string(), "https://b.local".to_string()]
        );
    }
}

//! Reference locations API backing the pin store's remote gateway.
//!
//! `locations import --file <path> [--truncate] [--dry-run]` bulk loads an exported
//! JSON array of pins instead of serving.

use std::path::PathBuf;

use portfolio::config::LocationsConfig;
use portfolio::error::AppError;
use portfolio::models::pin::LocationPin;
use portfolio::routes::locations_router;
use portfolio::services::locations::{ImportOptions, LocationRepository};
use portfolio::{init_logging, shutdown_signal};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging("info,portfolio=debug,tower_http=debug");

    let config = LocationsConfig::from_env()?;
    let repo = LocationRepository::open(config.db_path.clone()).await?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("import") {
        return import(&repo, &args[1..]).await;
    }

    let app = locations_router(repo, &config.allowed_origins);
    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("locations API listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn import(repo: &LocationRepository, args: &[String]) -> Result<(), AppError> {
    let mut file: Option<PathBuf> = None;
    let mut options = ImportOptions::default();
    let mut rest = args.iter();
    while let Some(arg) = rest.next() {
        match arg.as_str() {
            "--file" => file = rest.next().map(PathBuf::from),
            "--truncate" => options.truncate = true,
            "--dry-run" => options.dry_run = true,
            other => {
                return Err(AppError::Validation(format!(
                    "unknown import argument: {other}"
                )))
            }
        }
    }
    let file = file.ok_or_else(|| {
        AppError::Validation("usage: locations import --file <path> [--truncate] [--dry-run]".into())
    })?;

    let raw = tokio::fs::read_to_string(&file).await?;
    let pins: Vec<LocationPin> = serde_json::from_str(&raw)?;
    info!(count = pins.len(), file = %file.display(), "importing pins");
    let stats = repo.import(pins, options).await?;
    println!(
        "inserted {}, updated {}, deleted {}{}",
        stats.inserted,
        stats.updated,
        stats.deleted,
        if options.dry_run { " (dry run)" } else { "" }
    );
    Ok(())
}

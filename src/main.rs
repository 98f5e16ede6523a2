use portfolio::auth::fallback::hash_password;
use portfolio::config::AppConfig;
use portfolio::error::AppError;
use portfolio::routes::create_router;
use portfolio::state::AppState;
use portfolio::{init_logging, shutdown_signal};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    let mut args = std::env::args().skip(1);
    if let Some("hash-password") = args.next().as_deref() {
        let password = args
            .next()
            .ok_or_else(|| AppError::Validation("usage: portfolio hash-password <password>".into()))?;
        println!("{}", hash_password(&password)?);
        return Ok(());
    }

    init_logging("info,portfolio=debug");

    let config = AppConfig::from_env()?;
    let state = AppState::from_config(config.clone()).await?;
    info!(
        providers = ?state.auth.provider_names(),
        api = %config.api_base_url,
        "identity providers ready"
    );

    let loaded = state.warm_up().await;
    info!(pins = loaded, "pin store loaded");

    let app = create_router(state.clone());

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown();
    info!("shut down");
    Ok(())
}

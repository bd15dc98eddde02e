pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod ranking;
pub mod rate_limit;
pub mod schema;
pub mod store;

use std::net::SocketAddr;
use std::path::Path;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use api::AppState;
use auth::AdminAuth;
use config::Config;
use error::StartupError;
use store::PlayerStore;

/// Open the store and set up admin auth from `config`.
pub async fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let store = PlayerStore::open(config.database_url.as_deref(), config.seed_players).await?;
    let auth = AdminAuth::new(
        &config.admin_password,
        config.jwt_secret.as_deref(),
        config.admin_token_ttl_hours,
        config.local_mode,
    )?;
    Ok(AppState::new(store, auth, config.site.clone()))
}

/// The full application: API routes, metrics and CORS layers, and the
/// optional static front end with `index.html` fallback.
pub fn app(state: AppState, static_dir: Option<&Path>) -> Router {
    metrics::register_metrics();

    let mut router = api::router(state);
    if let Some(dir) = static_dir {
        let index = dir.join("index.html");
        router = router.fallback_service(ServeDir::new(dir).not_found_service(ServeFile::new(index)));
    }
    router
        .layer(axum::middleware::from_fn(metrics::track_requests))
        .layer(CorsLayer::permissive())
}

/// Run the server until Ctrl-C.
pub async fn serve(config: Config) -> Result<(), StartupError> {
    if config.uses_default_password() {
        tracing::warn!("ADMIN_PASSWORD not set, using the default admin password");
    }
    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET not set, admin tokens will not survive a restart");
    }
    if config.local_mode {
        tracing::warn!("Local mode: player mutations do not require an admin token");
    }

    let state = build_state(&config).await?;
    let players = state.store.len().await?;
    metrics::PLAYERS.set(i64::try_from(players).unwrap_or(i64::MAX));
    tracing::info!(
        store = state.store.backend_name(),
        players,
        "Player store ready"
    );

    let app = app(state, config.static_dir.as_deref());

    let addr = SocketAddr::new(config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::info!("StarTiers backend listening on {addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(StartupError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

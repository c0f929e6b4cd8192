use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use super::workers::room_sweeper;
use crate::api;
use crate::app::App;
use crate::infrastructure::clock::{SystemClock, SystemRandom};
use crate::infrastructure::config::{AppConfig, StoreBackend, StoreConfig};
use crate::infrastructure::memory_store::MemoryStore;
use crate::infrastructure::ports::{RoomRepo, UserRepo};
use crate::infrastructure::sqlite_store::SqliteStore;

/// How long shutdown waits for background workers.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Spawns a task that cancels `cancel_token` on SIGTERM/SIGINT.
fn setup_shutdown_signal(cancel_token: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
        }

        cancel_token.cancel();
    });
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

/// Open the configured store. One store serves both rooms and users.
pub async fn open_store(config: &StoreConfig) -> Result<(Arc<dyn RoomRepo>, Arc<dyn UserRepo>)> {
    match &config.backend {
        StoreBackend::Memory { path: None } => {
            tracing::info!("Using in-memory store (data is lost on exit)");
            let store = Arc::new(MemoryStore::new());
            Ok((store.clone(), store))
        }
        StoreBackend::Memory { path: Some(path) } => {
            tracing::info!(path = %path, "Using in-memory store mirrored to JSON file");
            let store = Arc::new(
                MemoryStore::with_file(path)
                    .await
                    .with_context(|| format!("failed to load memory store from {path}"))?,
            );
            Ok((store.clone(), store))
        }
        StoreBackend::Sqlite { path } => {
            tracing::info!(path = %path, "Using SQLite store");
            let store = Arc::new(
                SqliteStore::new(path)
                    .await
                    .with_context(|| format!("failed to open SQLite store at {path}"))?,
            );
            Ok((store.clone(), store))
        }
    }
}

fn build_cors_layer(allowed_origins: &[String]) -> Option<CorsLayer> {
    if allowed_origins.is_empty() {
        return None;
    }

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow ANY origin");
        return Some(cors.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();
    if origins.is_empty() {
        return None;
    }

    tracing::info!("CORS configured for origins: {:?}", allowed_origins);
    Some(cors.allow_origin(AllowOrigin::list(origins)))
}

/// HTTP router with tracing, CORS, and the optional static client.
pub fn build_router(app: Arc<App>, config: &AppConfig) -> Router {
    let mut router = api::http::routes();

    if let Some(dir) = &config.static_dir {
        tracing::info!(dir = %dir, "Serving static files");
        router = router.fallback_service(ServeDir::new(dir));
    }

    let mut router = router
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer(&config.cors_allowed_origins) {
        router = router.layer(cors);
    }
    router
}

pub async fn run() -> Result<()> {
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eom_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Energy of Money Engine");

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();
    setup_shutdown_signal(cancel_token.clone());

    let config = AppConfig::from_env()?;
    tracing::info!("Configuration loaded");
    tracing::info!("  Store: {:?}", config.store.backend);
    tracing::info!(
        "  Players: {}-{}, starting balance {}",
        config.rules.min_players,
        config.rules.max_players,
        config.rules.starting_balance
    );
    tracing::info!(
        "  Room TTL: {} min, sweep every {} s",
        config.cleanup.room_ttl_minutes,
        config.cleanup.interval_seconds
    );

    let (rooms, users) = open_store(&config.store).await?;
    let app = Arc::new(App::new(
        rooms,
        users,
        Arc::new(SystemClock::new()),
        Arc::new(SystemRandom::new()),
        config.catalog.clone(),
        config.rules,
    ));

    let sweeper = {
        let app = app.clone();
        let cleanup = config.cleanup.clone();
        let cancel = cancel_token.clone();
        tokio::spawn(async move { room_sweeper(app, cleanup, cancel).await })
    };

    let router = build_router(app, &config);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel_token.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    // The server can also stop on its own; make sure the workers follow.
    cancel_token.cancel();
    tracing::info!("Waiting for background workers to finish...");
    match tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, sweeper).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Room sweeper task failed"),
        Err(_) => tracing::warn!("Room sweeper did not stop in time"),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

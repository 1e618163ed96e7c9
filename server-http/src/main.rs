use axum::{extract::Request, ServiceExt};
use comments::{CommentService, SledStore};
use server_http::{build_router, AppState};
use shared::config::Config;
use std::sync::Arc;
use storage_engine::MokaCommentCache;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if exists)
    let dotenv = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting comments HTTP server...");
    match dotenv {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    // Load configuration from environment variables
    let config = Config::from_env();

    info!("Opening comment store at {}", config.store_path().display());
    let store = Arc::new(SledStore::open(config.store_path())?);

    info!(
        "Initializing comment cache (ttl={}s, max_entries={:?})",
        config.cache_ttl.as_secs(),
        config.cache_max_entries
    );
    let cache = Arc::new(MokaCommentCache::new(config.cache_max_entries));

    let comment_service = CommentService::new(store, cache).with_cache_ttl(config.cache_ttl);
    let state = AppState::new(Arc::new(comment_service));

    // Build router
    let router = build_router(state, &config);

    // Start server
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("HTTP Server listening on http://{}", config.bind_addr());

    // Graceful shutdown handler
    axum::serve(listener, ServiceExt::<Request>::into_make_service(router))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}

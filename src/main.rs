//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Opens the record store (importing a legacy document if configured)
//! - Starts the HTTP server with graceful shutdown support

use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use qrlink::config::Config;
use qrlink::document::StoreDocument;
use qrlink::route::create_app;
use qrlink::state::AppState;
use qrlink::store::{RecordStore, RedbStore};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("qrlink=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();

    let store = RedbStore::open(&config.database_url)
        .expect("Failed to initialize database")
        .with_bcrypt_cost(config.bcrypt_cost);

    if let Some(path) = &config.import_document {
        if let Err(err) = import_from_file(&store, path) {
            error!("Failed to import {}: {}", path, err);
            std::process::exit(1);
        }
        info!("Imported document {}", path);
    }

    let state = AppState::new(Arc::new(store), &config);

    let app = create_app(state).layer(TraceLayer::new_for_http());

    // Bind to all network interfaces on the specified port
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind address");

    info!("Server running at http://localhost:{}", config.port);
    info!("Using database: {}", config.database_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Loads a `{ users, links, qrCodes, analytics }` JSON file into the store
fn import_from_file(store: &RedbStore, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let json = std::fs::read_to_string(path)?;
    let document = StoreDocument::from_json(&json)?;
    store.import_document(&document)?;
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
///
/// Lets in-flight requests finish so no write transaction is cut short.
async fn shutdown_signal() {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}

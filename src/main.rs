// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mountain-Grid API Server
//!
//! Serves a user's activities grouped by day of the year, with manual
//! activity entry alongside Strava imports.

use mountain_grid::{
    config::{Config, StoreBackend},
    db::{ActivityStore, FirestoreDb, MemoryStore},
    services::FirebaseVerifier,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        store_backend = ?config.store_backend,
        "Starting Mountain-Grid API"
    );

    let store: Arc<dyn ActivityStore> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory activity store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let identity = FirebaseVerifier::from_config(&config)?;

    let state = Arc::new(AppState::new(config.clone(), store, identity));

    let app = mountain_grid::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mountain_grid=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Street Hunt API Server
//!
//! Serves the photo validation endpoint used by the game client.

use std::sync::Arc;
use street_hunt::{
    config::Config,
    db::SupabaseDb,
    services::{load_catalog, VisionService},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured JSON logging
    init_logging();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        model = %config.vision_model,
        "Starting Street Hunt API"
    );

    // Stickers added in the store validate against their own references
    let catalog = load_catalog(&SupabaseDb::from_config(&config)).await;
    let vision = VisionService::new(&config).with_catalog(&catalog);
    tracing::info!(
        app_url = %config.app_url,
        stickers = catalog.len(),
        "Vision service initialized"
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        vision,
    });

    let app = street_hunt::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("street_hunt=debug,info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .init();
}

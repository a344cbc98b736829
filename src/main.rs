use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use rotation_backend::api::{self, AppState};
use rotation_backend::clock::SystemClock;
use rotation_backend::config::Config;
use rotation_backend::metrics;
use rotation_backend::rewards::LocalizedCatalogs;

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "rotation-backend" }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    if !config.schedule.epoch_is_reset_in(&config.timezone) {
        tracing::warn!(
            "Rotation epoch {} is not a Tuesday 16:00 reset in {}; the rotation index will \
             change at a different time than the window boundaries (set ROTATION_TZ or ROTATION_EPOCH_MS)",
            config.schedule.epoch.to_rfc3339(),
            config.timezone.name()
        );
    }

    metrics::register_metrics();

    let catalogs = match LocalizedCatalogs::load_dir(&config.data_dir) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load reward data: {e}");
            std::process::exit(1);
        }
    };
    if catalogs.is_empty() {
        tracing::warn!(
            "No reward datasets found under {}; rotation lookups will return no rewards",
            config.data_dir.display()
        );
    }
    for (locale, catalog) in catalogs.iter() {
        metrics::REWARD_ENTRIES_LOADED
            .with_label_values(&[locale.code()])
            .set(catalog.len() as i64);
    }

    let state = AppState {
        catalogs: Arc::new(catalogs),
        schedule: config.schedule,
        timezone: config.timezone,
        clock: Arc::new(SystemClock),
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(api::router(state))
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {addr}: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Rotation backend listening on {addr} (reset timezone {}, {} rotations)",
        config.timezone.name(),
        config.schedule.total_rotations
    );
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

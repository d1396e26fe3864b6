use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use common::utils::logging::init_logging_from_env;
use configs::AppConfig;
use dotenvy::dotenv;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::routes;
use crate::state::AppState;
use service::{
    drinks::DrinkService,
    images::{UploadRules, UploadStore},
    runtime,
    storage::JsonFileStore,
};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

fn bind_addr(cfg: &AppConfig) -> anyhow::Result<SocketAddr> {
    Ok(format!("{}:{}", cfg.server.host, cfg.server.port).parse()?)
}

/// Prepare directories, open the JSON store and wire the drink service.
pub async fn build_state(cfg: &AppConfig) -> anyhow::Result<AppState> {
    let storage = &cfg.storage;
    let data_dir = storage.data_file.parent().unwrap_or(std::path::Path::new(""));
    runtime::ensure_env(&storage.public_dir, data_dir, &storage.uploads_dir).await?;

    let store = JsonFileStore::new(&storage.data_file).await?;
    let uploads = UploadStore::new(
        &storage.uploads_dir,
        &storage.public_prefix,
        UploadRules { max_file_bytes: cfg.uploads.max_file_bytes, max_files: cfg.uploads.max_files },
    );
    let drinks = Arc::new(DrinkService::new(store, uploads));
    Ok(AppState { drinks, public_dir: storage.public_dir.clone() })
}

pub fn build_app(state: AppState) -> Router {
    routes::build_router(state, build_cors())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!(event = "shutdown_signal", "received Ctrl+C, draining connections");
    }
}

/// Serve with an already loaded configuration until Ctrl+C.
pub async fn run_with_config(cfg: AppConfig) -> anyhow::Result<()> {
    let state = build_state(&cfg).await?;
    let app = build_app(state);

    let addr = bind_addr(&cfg)?;
    info!(%addr, data_file = %cfg.storage.data_file.display(), "starting cafe menu server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

/// Public entry: load configuration, build the app and run the HTTP server
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();
    let cfg = AppConfig::load_and_validate()?;
    run_with_config(cfg).await
}

pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::detection_client::DetectionClient;
use crate::services::host_platform::PgHostPlatform;
use crate::services::result_store::PgResultStore;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let detection = DetectionClient::from_settings(&settings)?;
    if !settings.detection().is_configured() {
        tracing::warn!("Detection is disabled or missing credentials; events will be ignored");
    }

    let state = AppState::new(
        settings,
        Arc::new(PgResultStore::new(db_pool.clone())),
        Arc::new(detection),
        Arc::new(PgHostPlatform::new(db_pool.clone())),
    );

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        enabled_modules = ?state.settings().detection().enabled_modules,
        "AI detection bridge listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    db_pool.close().await;
    tracing::info!("Database pool closed");

    result?;

    Ok(())
}

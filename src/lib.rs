//! loadtest-panel -- control panel for load tests executed by GitHub Actions.
//!
//! The panel runs no load itself. It dispatches the load test workflow,
//! correlates client-generated test ids with the runs they produce,
//! reconciles run state into a stable result shape, and unpacks result
//! artifacts once runs complete.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod panel;
pub mod reconcile;

use anyhow::Result;

use crate::config::PanelConfig;
use crate::panel::LoadTestPanel;

/// Start the panel's HTTP API.
pub async fn serve(bind: &str, config: PanelConfig) -> Result<()> {
    let panel = LoadTestPanel::from_config(config)?;
    if panel.config().require_token().is_err() {
        tracing::warn!("GITHUB_TOKEN is not set; every operation will fail until it is configured");
    }

    let addr: std::net::SocketAddr = bind.parse()?;
    tracing::info!(repository = %panel.repository(), "targeting repository");
    let app = api::router(api::state::AppState::new(panel));

    tracing::info!(%addr, "loadtest-panel listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

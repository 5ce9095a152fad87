//! API route definitions.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Value};

use super::state::AppState;
use crate::error::PanelError;
use crate::panel::{CancelOutcome, TriggerOutcome, TriggerRequest};
use crate::reconcile::{TestId, TestResult};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/trigger", post(trigger))
        .route("/status/{test_id}", get(status))
        .route("/history", get(history))
        .route("/cancel/{test_id}", post(cancel))
}

#[derive(Serialize)]
struct HistoryResponse {
    tests: Vec<TestResult>,
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "repository": state.panel.repository(),
        "tokenConfigured": state.panel.config().require_token().is_ok(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn trigger(
    State(state): State<AppState>,
    body: Result<Json<TriggerRequest>, JsonRejection>,
) -> Result<Json<TriggerOutcome>, PanelError> {
    let Json(request) = body.map_err(|e| PanelError::Validation(e.body_text()))?;
    Ok(Json(state.panel.trigger(request).await?))
}

async fn status(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<TestResult>, PanelError> {
    Ok(Json(state.panel.status(&TestId::new(test_id)).await?))
}

async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, PanelError> {
    let tests = state.panel.history().await?;
    Ok(Json(HistoryResponse { tests }))
}

async fn cancel(
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<CancelOutcome>, PanelError> {
    Ok(Json(state.panel.cancel(&TestId::new(test_id)).await?))
}

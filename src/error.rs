//! Operation-level error kinds and their HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;

/// Errors surfaced by the four panel operations.
#[derive(Debug, Error)]
pub enum PanelError {
    /// The workflow engine credential is not configured.
    #[error("GitHub token not configured")]
    Configuration,

    /// Malformed trigger input.
    #[error("{0}")]
    Validation(String),

    /// The workflow engine rejected or failed a required call.
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: EngineError,
    },

    /// No remote run correlates with the identifier.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PanelError {
    pub fn upstream(context: &'static str, source: EngineError) -> Self {
        PanelError::Upstream { context, source }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PanelError::Validation(_) => StatusCode::BAD_REQUEST,
            PanelError::NotFound(_) => StatusCode::NOT_FOUND,
            PanelError::Configuration | PanelError::Upstream { .. } | PanelError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand to the presentation layer.
    pub fn public_message(&self) -> String {
        match self {
            PanelError::Upstream { context, .. } => (*context).to_string(),
            PanelError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            PanelError::Internal(e) => tracing::error!(error = ?e, "unexpected failure"),
            PanelError::Upstream { .. } | PanelError::Configuration => {
                tracing::error!(error = %self, "operation failed")
            }
            _ => tracing::debug!(error = %self, %status, "request rejected"),
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

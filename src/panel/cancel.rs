use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::LoadTestPanel;
use crate::engine::{RunQuery, RunScope};
use crate::error::PanelError;
use crate::reconcile::locate::{locate, LocateRules};
use crate::reconcile::TestId;

pub const CANCEL_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOutcome {
    pub success: bool,
    pub test_id: TestId,
    /// Id of the cancelled run.
    pub workflow_id: u64,
    pub message: String,
}

impl LoadTestPanel {
    pub async fn cancel(&self, test_id: &TestId) -> Result<CancelOutcome, PanelError> {
        self.cancel_at(test_id, Utc::now()).await
    }

    /// Cancel the in-progress run correlated with `test_id`. Not idempotent:
    /// once the run stops, a repeat call finds nothing and reports not found.
    pub async fn cancel_at(
        &self,
        test_id: &TestId,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome, PanelError> {
        self.config.require_token()?;

        let query = RunQuery::new(RunScope::Repository, CANCEL_PAGE_SIZE).with_status("in_progress");
        let runs = self
            .engine
            .list_runs(&query)
            .await
            .map_err(|e| PanelError::upstream("Failed to fetch running workflows", e))?;

        let found = locate(test_id, &runs, now, &LocateRules::cancellation()).ok_or_else(|| {
            info!(%test_id, in_progress = runs.len(), "no running workflow to cancel");
            PanelError::NotFound("No running workflow found for this test".to_string())
        })?;

        let run_id = found.run.id;
        info!(%test_id, run_id, matched_by = found.reason.as_str(), "cancelling run");
        self.engine
            .cancel_run(run_id)
            .await
            .map_err(|e| PanelError::upstream("Failed to cancel workflow", e))?;

        Ok(CancelOutcome {
            success: true,
            test_id: test_id.clone(),
            workflow_id: run_id,
            message: "Test cancelled successfully".to_string(),
        })
    }
}

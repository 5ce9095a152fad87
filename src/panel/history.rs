use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use super::LoadTestPanel;
use crate::engine::{RunQuery, WorkflowRun};
use crate::error::PanelError;
use crate::reconcile::classify::classify;
use crate::reconcile::{metadata, CanonicalStatus, TestId, TestResult};

pub const HISTORY_LIMIT: usize = 20;

/// Identifier a history entry is reported under: the first test id found in
/// the title, display title or commit message, else `run_<id>`.
pub fn history_id(run: &WorkflowRun) -> TestId {
    [run.name.as_deref(), run.display_title.as_deref(), run.commit_message()]
        .into_iter()
        .flatten()
        .find_map(TestId::find_in)
        .unwrap_or_else(|| TestId::for_run(run.id))
}

impl LoadTestPanel {
    /// The newest load test runs, newest first.
    ///
    /// Completed runs are enriched from their artifacts concurrently; an
    /// enrichment failure only costs that entry its metrics.
    pub async fn history(&self) -> Result<Vec<TestResult>, PanelError> {
        self.config.require_token()?;

        let scope = self.workflow_scope().await;
        let mut runs = self
            .engine
            .list_runs(&RunQuery::new(scope, HISTORY_LIMIT as u32))
            .await
            .map_err(|e| PanelError::upstream("Failed to fetch workflow runs", e))?;
        debug!(count = runs.len(), "listed runs for history");

        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        runs.truncate(HISTORY_LIMIT);

        let concurrency = self.config.history.enrich_concurrency.max(1);
        let tests: Vec<TestResult> = stream::iter(runs)
            .map(|run| self.history_entry(run))
            .buffered(concurrency)
            .collect()
            .await;

        if let Some(latest) = tests.first() {
            info!(
                count = tests.len(),
                latest = %latest.test_id,
                latest_status = %latest.status,
                "history assembled"
            );
        }
        Ok(tests)
    }

    async fn history_entry(&self, run: WorkflowRun) -> TestResult {
        let mut result = TestResult::from_run(
            history_id(&run),
            &run,
            classify(&run),
            metadata::parse(run.title()),
        );
        if result.status == CanonicalStatus::Completed {
            self.enrich(&mut result, run.id).await;
        }
        result
    }
}

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::LoadTestPanel;
use crate::engine::{RunQuery, RunScope, WorkflowRun};
use crate::error::PanelError;
use crate::reconcile::classify::classify;
use crate::reconcile::locate::{locate, most_recent_dispatch, LocateRules};
use crate::reconcile::{metadata, CanonicalStatus, TestId, TestResult};

pub const STATUS_PAGE_SIZE: u32 = 50;

/// How long after dispatch a run may still be missing from listings.
pub fn startup_grace() -> Duration {
    Duration::minutes(5)
}

impl LoadTestPanel {
    pub async fn status(&self, test_id: &TestId) -> Result<TestResult, PanelError> {
        self.status_at(test_id, Utc::now()).await
    }

    /// Status of `test_id` as seen at `now`.
    ///
    /// A run that cannot be found yet is reported as `running` with a
    /// progress message rather than as an error.
    pub async fn status_at(
        &self,
        test_id: &TestId,
        now: DateTime<Utc>,
    ) -> Result<TestResult, PanelError> {
        self.config.require_token()?;

        let runs = self.status_candidates().await?;
        debug!(%test_id, candidates = runs.len(), "looking up run");

        let run = match locate(test_id, &runs, now, &LocateRules::status_lookup()) {
            Some(found) => {
                info!(%test_id, run_id = found.run.id, matched_by = found.reason.as_str(), "run located");
                Some(found.run)
            }
            None => {
                let fallback = most_recent_dispatch(&runs, now, startup_grace());
                if let Some(run) = fallback {
                    info!(%test_id, run_id = run.id, "using most recent dispatched run");
                }
                fallback
            }
        };

        let Some(run) = run else {
            return Ok(unmatched(test_id, now));
        };

        let mut result = TestResult::from_run(
            test_id.clone(),
            run,
            classify(run),
            metadata::parse(run.title()),
        );
        if result.status == CanonicalStatus::Completed {
            self.enrich(&mut result, run.id).await;
        }
        Ok(result)
    }

    /// Runs of the load test workflow, or of the whole repository when the
    /// scoped listing is rejected.
    async fn status_candidates(&self) -> Result<Vec<WorkflowRun>, PanelError> {
        let scope = self.workflow_scope().await;
        match self.engine.list_runs(&RunQuery::new(scope, STATUS_PAGE_SIZE)).await {
            Ok(runs) => Ok(runs),
            Err(e) => {
                warn!(error = %e, "workflow run listing failed, trying all repository runs");
                self.engine
                    .list_runs(&RunQuery::new(RunScope::Repository, STATUS_PAGE_SIZE))
                    .await
                    .map_err(|e| PanelError::upstream("Failed to fetch workflow runs", e))
            }
        }
    }
}

fn unmatched(test_id: &TestId, now: DateTime<Utc>) -> TestResult {
    match test_id.created_at() {
        Some(created) if now - created < startup_grace() => {
            debug!(%test_id, age_secs = (now - created).num_seconds(), "run not visible yet");
            TestResult::placeholder(test_id.clone(), "Workflow starting...")
        }
        _ => {
            debug!(%test_id, "no run matches");
            TestResult::placeholder(test_id.clone(), "Searching for workflow run...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_fresh_id_is_starting() {
        let now = Utc::now();
        let id = TestId::generate(now - Duration::seconds(40));
        let result = unmatched(&id, now);
        assert_eq!(result.status, CanonicalStatus::Running);
        assert_eq!(result.message.as_deref(), Some("Workflow starting..."));
    }

    #[test]
    fn test_unmatched_old_or_foreign_id_is_searching() {
        let now = Utc::now();
        let old = TestId::generate(now - Duration::minutes(6));
        assert_eq!(
            unmatched(&old, now).message.as_deref(),
            Some("Searching for workflow run...")
        );
        assert_eq!(
            unmatched(&TestId::new("custom"), now).message.as_deref(),
            Some("Searching for workflow run...")
        );
    }
}

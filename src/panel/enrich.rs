//! Best-effort artifact enrichment of completed runs.

use tracing::{debug, warn};

use super::LoadTestPanel;
use crate::reconcile::metadata::ArtifactReport;
use crate::reconcile::{archive, TestId, TestResult};

impl LoadTestPanel {
    /// Layer the run's result artifact over `result`. Failures are logged and
    /// leave `result` as it was.
    pub(crate) async fn enrich(&self, result: &mut TestResult, run_id: u64) {
        if let Some(report) = self.fetch_report(run_id, &result.test_id).await {
            result.layer_report(report);
        }
    }

    async fn fetch_report(&self, run_id: u64, test_id: &TestId) -> Option<ArtifactReport> {
        let artifacts = match self.engine.list_artifacts(run_id).await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                warn!(run_id, error = %e, "could not list artifacts");
                return None;
            }
        };

        let Some(artifact) = artifacts
            .iter()
            .find(|a| !a.expired && a.name.contains(test_id.as_str()))
        else {
            debug!(run_id, %test_id, listed = artifacts.len(), "no result artifact");
            return None;
        };

        let bytes = match self.engine.download_artifact(artifact.id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(run_id, artifact_id = artifact.id, error = %e, "could not download artifact");
                return None;
            }
        };

        let data = archive::extract(&bytes)?;
        debug!(run_id, artifact = %artifact.name, "artifact results loaded");
        Some(ArtifactReport::from_json(&data))
    }
}

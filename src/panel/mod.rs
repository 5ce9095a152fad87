//! The four panel operations: trigger, status, history and cancel.
//!
//! Every call re-reads the workflow engine; nothing is cached between calls.

mod cancel;
mod enrich;
mod history;
mod status;
mod trigger;

pub use cancel::{CancelOutcome, CANCEL_PAGE_SIZE};
pub use history::{history_id, HISTORY_LIMIT};
pub use status::{startup_grace, STATUS_PAGE_SIZE};
pub use trigger::{TriggerOutcome, TriggerRequest};

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::PanelConfig;
use crate::engine::{GithubClient, RunScope, WorkflowEngine};

/// Orchestrates load test runs on the remote workflow engine.
#[derive(Clone)]
pub struct LoadTestPanel {
    config: Arc<PanelConfig>,
    engine: Arc<dyn WorkflowEngine>,
}

impl LoadTestPanel {
    pub fn new(config: Arc<PanelConfig>, engine: Arc<dyn WorkflowEngine>) -> Self {
        Self { config, engine }
    }

    /// Panel talking to GitHub with the given configuration.
    pub fn from_config(config: PanelConfig) -> anyhow::Result<Self> {
        let engine = GithubClient::new(&config.github)?;
        Ok(Self::new(Arc::new(config), Arc::new(engine)))
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// `owner/repo` of the target repository.
    pub fn repository(&self) -> String {
        format!("{}/{}", self.config.github.owner, self.config.github.repo)
    }

    /// Listing scope for the load test workflow: its numeric id when the
    /// engine lists it, otherwise its file name.
    async fn workflow_scope(&self) -> RunScope {
        let github = &self.config.github;
        let path = github.workflow_path();

        match self.engine.list_workflows().await {
            Ok(workflows) => {
                if let Some(wf) = workflows
                    .iter()
                    .find(|w| w.name == github.workflow_name || w.path == path)
                {
                    debug!(workflow_id = wf.id, name = %wf.name, "resolved workflow");
                    return RunScope::WorkflowId(wf.id);
                }
                debug!(
                    available = workflows.len(),
                    %path,
                    "workflow not listed, falling back to file name"
                );
            }
            Err(e) => warn!(error = %e, "could not list workflows, falling back to file name"),
        }

        RunScope::WorkflowFile(github.workflow_file.clone())
    }
}

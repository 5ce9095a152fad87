//! Workflow engine boundary: the records it exposes and the calls the panel
//! makes against it.
//!
//! The engine owns every record here. The panel only reads them.

pub mod github;

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use github::GithubClient;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// One execution of a workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    /// Primary title. The load test workflow renders its inputs here.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display_title: Option<String>,
    #[serde(default)]
    pub head_commit: Option<HeadCommit>,
    /// Raw lifecycle state: `queued`, `in_progress`, `completed`, `waiting`, ...
    #[serde(default)]
    pub status: Option<String>,
    /// Outcome once finished: `success`, `failure`, `cancelled`, ...
    #[serde(default)]
    pub conclusion: Option<String>,
    /// Trigger kind, e.g. `workflow_dispatch` or `push`.
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl WorkflowRun {
    pub fn commit_message(&self) -> Option<&str> {
        self.head_commit.as_ref()?.message.as_deref()
    }

    /// The title metadata is read from: `name`, else `display_title`.
    /// Empty strings count as absent.
    pub fn title(&self) -> &str {
        non_empty(&self.name)
            .or_else(|| non_empty(&self.display_title))
            .unwrap_or("")
    }
}

fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|t| !t.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeadCommit {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: u64,
    pub name: String,
    pub path: String,
}

/// A stored file bundle produced by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub expired: bool,
}

/// Which runs a listing covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    Repository,
    WorkflowId(u64),
    WorkflowFile(String),
}

/// A paginated run listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunQuery {
    pub scope: RunScope,
    pub status: Option<String>,
    pub per_page: u32,
}

impl RunQuery {
    pub fn new(scope: RunScope, per_page: u32) -> Self {
        Self {
            scope,
            status: None,
            per_page,
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// The calls the panel makes against the remote workflow engine.
///
/// Implementations apply their own request timeout and never retry.
#[async_trait::async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn list_workflows(&self) -> Result<Vec<Workflow>, EngineError>;

    /// Runs matching `query`, most recently created first.
    async fn list_runs(&self, query: &RunQuery) -> Result<Vec<WorkflowRun>, EngineError>;

    /// Request a new run of `workflow` (a file name or numeric id) on `git_ref`.
    async fn dispatch(
        &self,
        workflow: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<(), EngineError>;

    async fn cancel_run(&self, run_id: u64) -> Result<(), EngineError>;

    async fn list_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>, EngineError>;

    /// Raw ZIP bytes of one artifact.
    async fn download_artifact(&self, artifact_id: u64) -> Result<Bytes, EngineError>;
}

//! In-memory workflow engine for driving the panel in tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use loadtest_panel::config::PanelConfig;
use loadtest_panel::engine::{
    Artifact, EngineError, RunQuery, RunScope, Workflow, WorkflowEngine, WorkflowRun,
};
use loadtest_panel::panel::LoadTestPanel;

pub const INBOX: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListWorkflows,
    ListRuns(RunQuery),
    Dispatch {
        workflow: String,
        git_ref: String,
        inputs: BTreeMap<String, String>,
    },
    Cancel(u64),
    ListArtifacts(u64),
    Download(u64),
}

#[derive(Default)]
pub struct FakeEngine {
    pub workflows: Vec<Workflow>,
    pub runs: Vec<WorkflowRun>,
    pub artifacts: HashMap<u64, Vec<Artifact>>,
    pub downloads: HashMap<u64, Vec<u8>>,
    pub fail_workflows: bool,
    pub fail_scoped_runs: bool,
    pub fail_repository_runs: bool,
    pub fail_dispatch: bool,
    pub fail_cancel: bool,
    pub fail_artifacts_for: HashSet<u64>,
    pub calls: Mutex<Vec<Call>>,
}

fn rejected(endpoint: &str, status: u16) -> EngineError {
    EngineError::Status {
        endpoint: endpoint.to_string(),
        status,
        body: "{\"message\":\"nope\"}".to_string(),
    }
}

impl FakeEngine {
    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn run_queries(&self) -> Vec<RunQuery> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ListRuns(q) => Some(q),
                _ => None,
            })
            .collect()
    }

    pub fn downloads_made(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Download(_)))
            .count()
    }

    /// Attach a result artifact named after `test_id` to `run_id`.
    pub fn with_artifact(mut self, run_id: u64, test_id: &str, zip: Vec<u8>) -> Self {
        let artifact_id = run_id * 10;
        self.artifacts.entry(run_id).or_default().push(Artifact {
            id: artifact_id,
            name: format!("load-test-results-{}", test_id),
            expired: false,
        });
        self.downloads.insert(artifact_id, zip);
        self
    }
}

#[async_trait::async_trait]
impl WorkflowEngine for FakeEngine {
    async fn list_workflows(&self) -> Result<Vec<Workflow>, EngineError> {
        self.record(Call::ListWorkflows);
        if self.fail_workflows {
            return Err(rejected("/actions/workflows", 500));
        }
        Ok(self.workflows.clone())
    }

    async fn list_runs(&self, query: &RunQuery) -> Result<Vec<WorkflowRun>, EngineError> {
        self.record(Call::ListRuns(query.clone()));
        let failing = match query.scope {
            RunScope::Repository => self.fail_repository_runs,
            _ => self.fail_scoped_runs,
        };
        if failing {
            return Err(rejected("/actions/runs", 404));
        }
        Ok(self
            .runs
            .iter()
            .filter(|r| query.status.is_none() || r.status == query.status)
            .take(query.per_page as usize)
            .cloned()
            .collect())
    }

    async fn dispatch(
        &self,
        workflow: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<(), EngineError> {
        self.record(Call::Dispatch {
            workflow: workflow.to_string(),
            git_ref: git_ref.to_string(),
            inputs: inputs.clone(),
        });
        if self.fail_dispatch {
            return Err(rejected("/actions/workflows/load-test.yml/dispatches", 422));
        }
        Ok(())
    }

    async fn cancel_run(&self, run_id: u64) -> Result<(), EngineError> {
        self.record(Call::Cancel(run_id));
        if self.fail_cancel {
            return Err(rejected("/actions/runs/cancel", 409));
        }
        Ok(())
    }

    async fn list_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>, EngineError> {
        self.record(Call::ListArtifacts(run_id));
        if self.fail_artifacts_for.contains(&run_id) {
            return Err(rejected("/actions/runs/artifacts", 502));
        }
        Ok(self.artifacts.get(&run_id).cloned().unwrap_or_default())
    }

    async fn download_artifact(&self, artifact_id: u64) -> Result<Bytes, EngineError> {
        self.record(Call::Download(artifact_id));
        self.downloads
            .get(&artifact_id)
            .map(|b| Bytes::from(b.clone()))
            .ok_or_else(|| rejected("/actions/artifacts/zip", 410))
    }
}

pub fn config_with_token() -> PanelConfig {
    let mut config = PanelConfig::default();
    config.github.token = Some("ghp_test".to_string());
    config
}

pub fn panel(engine: FakeEngine) -> (LoadTestPanel, Arc<FakeEngine>) {
    panel_with_config(engine, config_with_token())
}

pub fn panel_with_config(engine: FakeEngine, config: PanelConfig) -> (LoadTestPanel, Arc<FakeEngine>) {
    let engine = Arc::new(engine);
    let dyn_engine: Arc<dyn WorkflowEngine> = engine.clone();
    (LoadTestPanel::new(Arc::new(config), dyn_engine), engine)
}

/// A run created `minutes_ago` before `now` and last updated 30 s later.
pub fn run(
    id: u64,
    name: &str,
    status: &str,
    conclusion: Option<&str>,
    now: DateTime<Utc>,
    minutes_ago: i64,
) -> WorkflowRun {
    let created = now - Duration::minutes(minutes_ago);
    WorkflowRun {
        id,
        name: Some(name.to_string()),
        display_title: Some("XMTP Load Test".to_string()),
        head_commit: None,
        status: Some(status.to_string()),
        conclusion: conclusion.map(str::to_string),
        event: Some("push".to_string()),
        created_at: Some(created),
        updated_at: Some(created + Duration::seconds(30)),
        html_url: Some(format!("https://github.com/andy-t-wang/xmtp-load-test-web/actions/runs/{}", id)),
    }
}

pub fn dispatched(mut run: WorkflowRun) -> WorkflowRun {
    run.event = Some("workflow_dispatch".to_string());
    run
}

pub fn title(test_id: &str, network: &str, groups: u32) -> String {
    format!(
        "Test {} | Network: {} | Groups: {} | Inbox: {}",
        test_id, network, groups, INBOX
    )
}

pub fn results_zip(entry: &str, json: &str) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    writer.start_file(entry, options).unwrap();
    writer.write_all(json.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

//! Run correlation and status reconciliation.
//!
//! Turns raw [`WorkflowRun`] records into stable [`TestResult`]s: find the run
//! behind a test identifier ([`locate`]), collapse its lifecycle into a
//! [`CanonicalStatus`] ([`classify`]), read metadata out of its title
//! ([`metadata`]) and unpack its result artifact ([`archive`]).

pub mod archive;
pub mod classify;
pub mod locate;
pub mod metadata;

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::WorkflowRun;
use self::classify::Classification;
use self::metadata::{ArtifactReport, RunMetadata, TestMetrics};

// ---------------------------------------------------------------------------
// TestId
// ---------------------------------------------------------------------------

const ID_SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ID_SUFFIX_LEN: usize = 9;

fn embedded_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"test_[0-9]+_[A-Za-z0-9_]+").expect("valid test id pattern"))
}

fn id_timestamp_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"test_([0-9]+)_").expect("valid test id pattern"))
}

/// Client-generated correlation key, `test_<epoch-ms>_<random>`.
///
/// The only link between a dispatch and the run it produces: the workflow
/// echoes it into the run title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TestId(String);

impl TestId {
    pub fn new(id: impl Into<String>) -> Self {
        TestId(id.into())
    }

    /// A fresh identifier stamped with `now`.
    pub fn generate(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| ID_SUFFIX_ALPHABET[rng.gen_range(0..ID_SUFFIX_ALPHABET.len())] as char)
            .collect();
        TestId(format!("test_{}_{}", now.timestamp_millis(), suffix))
    }

    /// Identifier synthesized for runs that carry none.
    pub fn for_run(run_id: u64) -> Self {
        TestId(format!("run_{}", run_id))
    }

    /// First identifier-shaped substring of `text`.
    pub fn find_in(text: &str) -> Option<Self> {
        embedded_id_pattern()
            .find(text)
            .map(|m| TestId(m.as_str().to_string()))
    }

    /// Creation time encoded in the identifier, if it has one.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let millis = id_timestamp_pattern()
            .captures(&self.0)?
            .get(1)?
            .as_str()
            .parse::<i64>()
            .ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TestId {
    fn from(s: &str) -> Self {
        TestId(s.to_string())
    }
}

impl From<String> for TestId {
    fn from(s: String) -> Self {
        TestId(s)
    }
}

// ---------------------------------------------------------------------------
// Canonical result
// ---------------------------------------------------------------------------

/// The panel's three-state view of a run. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalStatus {
    Running,
    Completed,
    Failed,
}

impl CanonicalStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, CanonicalStatus::Running)
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanonicalStatus::Running => write!(f, "running"),
            CanonicalStatus::Completed => write!(f, "completed"),
            CanonicalStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Reconciled view of one load test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: TestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
    pub status: CanonicalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Whole seconds between start and end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    /// Progress note for synthesized placeholder results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub metadata: RunMetadata,
    #[serde(flatten)]
    pub metrics: TestMetrics,
}

impl TestResult {
    /// A `running` result for a test whose run is not visible yet.
    pub fn placeholder(test_id: TestId, message: impl Into<String>) -> Self {
        Self {
            test_id,
            run_id: None,
            status: CanonicalStatus::Running,
            start_time: None,
            end_time: None,
            duration: None,
            github_url: None,
            failure_reason: None,
            message: Some(message.into()),
            metadata: RunMetadata::default(),
            metrics: TestMetrics::default(),
        }
    }

    /// Result for a located run, before any artifact enrichment.
    pub fn from_run(
        test_id: TestId,
        run: &WorkflowRun,
        classification: Classification,
        metadata: RunMetadata,
    ) -> Self {
        Self {
            test_id,
            run_id: Some(run.id),
            status: classification.status,
            start_time: run.created_at,
            end_time: run.updated_at,
            duration: duration_secs(run.created_at, run.updated_at),
            github_url: run.html_url.clone(),
            failure_reason: classification.failure_reason,
            message: None,
            metadata,
            metrics: TestMetrics::default(),
        }
    }

    /// Layer artifact data over what the title gave us. Artifact values win.
    pub fn layer_report(&mut self, report: ArtifactReport) {
        self.metadata = std::mem::take(&mut self.metadata).layered(report.metadata);
        self.metrics = std::mem::take(&mut self.metrics).layered(report.metrics);
    }
}

/// Floored whole seconds from `start` to `end`. `None` unless both are known
/// and `end` is not before `start`.
pub fn duration_secs(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<u64> {
    let elapsed = end? - start?;
    u64::try_from(elapsed.num_seconds()).ok().filter(|_| elapsed >= chrono::Duration::zero())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

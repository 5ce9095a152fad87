//! Raw run state to canonical status.

use super::CanonicalStatus;
use crate::engine::WorkflowRun;

pub const CANCELLED_REASON: &str = "Cancelled by user";

/// Canonical status plus, for failed runs, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: CanonicalStatus,
    pub failure_reason: Option<String>,
}

/// Map `status`/`conclusion` onto the three canonical states.
///
/// Unknown raw states (`waiting`, `requested`, ...) count as failed rather
/// than assumed healthy.
pub fn classify(run: &WorkflowRun) -> Classification {
    classify_raw(run.status.as_deref(), run.conclusion.as_deref())
}

pub fn classify_raw(status: Option<&str>, conclusion: Option<&str>) -> Classification {
    let status = match status {
        Some("completed") if conclusion == Some("success") => CanonicalStatus::Completed,
        Some("in_progress") | Some("queued") => CanonicalStatus::Running,
        _ => CanonicalStatus::Failed,
    };

    let failure_reason = match (status, conclusion) {
        (CanonicalStatus::Failed, Some("cancelled")) => Some(CANCELLED_REASON.to_string()),
        (CanonicalStatus::Failed, Some(other)) => Some(other.to_string()),
        _ => None,
    };

    Classification {
        status,
        failure_reason,
    }
}

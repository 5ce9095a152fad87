//! Heuristic join between a [`TestId`] and the run it produced.
//!
//! The engine stores the identifier only as free text inside titles, so the
//! join is by substring, with a time-window fallback for manually dispatched
//! runs whose titles do not (yet) mention it. Two tests dispatched inside the
//! same window are not reliably distinguishable: the fallback takes whichever
//! recent dispatch comes first in the listing, i.e. the newest.

use chrono::{DateTime, Duration, Utc};

use super::TestId;
use crate::engine::WorkflowRun;

/// Trigger kind of runs started through the dispatch API.
pub const MANUAL_DISPATCH_EVENT: &str = "workflow_dispatch";

/// Which rule tied a run to the identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    Title,
    DisplayTitle,
    CommitMessage,
    RecentDispatch,
}

impl MatchReason {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchReason::Title => "title",
            MatchReason::DisplayTitle => "display_title",
            MatchReason::CommitMessage => "commit_message",
            MatchReason::RecentDispatch => "recent_dispatch",
        }
    }
}

/// Matching rules for one kind of lookup.
#[derive(Debug, Clone, Copy)]
pub struct LocateRules {
    pub match_commit_message: bool,
    pub recency_window: Duration,
}

impl LocateRules {
    /// Single-run status lookup.
    pub fn status_lookup() -> Self {
        Self {
            match_commit_message: true,
            recency_window: Duration::minutes(15),
        }
    }

    /// Finding the in-progress run to cancel.
    pub fn cancellation() -> Self {
        Self {
            match_commit_message: false,
            recency_window: Duration::minutes(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Located<'a> {
    pub run: &'a WorkflowRun,
    pub reason: MatchReason,
}

/// Whether `run` is a manual dispatch created less than `window` before `now`.
pub fn is_recent_dispatch(run: &WorkflowRun, now: DateTime<Utc>, window: Duration) -> bool {
    run.event.as_deref() == Some(MANUAL_DISPATCH_EVENT)
        && run.created_at.is_some_and(|created| now - created < window)
}

fn contains(text: Option<&str>, id: &TestId) -> bool {
    text.is_some_and(|t| t.contains(id.as_str()))
}

fn match_reason(
    id: &TestId,
    run: &WorkflowRun,
    now: DateTime<Utc>,
    rules: &LocateRules,
) -> Option<MatchReason> {
    if contains(run.name.as_deref(), id) {
        Some(MatchReason::Title)
    } else if contains(run.display_title.as_deref(), id) {
        Some(MatchReason::DisplayTitle)
    } else if rules.match_commit_message && contains(run.commit_message(), id) {
        Some(MatchReason::CommitMessage)
    } else if is_recent_dispatch(run, now, rules.recency_window) {
        Some(MatchReason::RecentDispatch)
    } else {
        None
    }
}

/// First candidate, in listing order (newest first), that any rule ties to
/// `id`. The reason reports the strongest rule that run satisfied.
pub fn locate<'a>(
    id: &TestId,
    candidates: &'a [WorkflowRun],
    now: DateTime<Utc>,
    rules: &LocateRules,
) -> Option<Located<'a>> {
    if id.is_empty() {
        return None;
    }
    candidates.iter().find_map(|run| {
        match_reason(id, run, now, rules).map(|reason| Located { run, reason })
    })
}

/// Newest manual dispatch created within `window` of `now`, regardless of
/// listing order.
pub fn most_recent_dispatch(
    candidates: &[WorkflowRun],
    now: DateTime<Utc>,
    window: Duration,
) -> Option<&WorkflowRun> {
    candidates
        .iter()
        .filter(|run| is_recent_dispatch(run, now, window))
        .max_by_key(|run| run.created_at)
}

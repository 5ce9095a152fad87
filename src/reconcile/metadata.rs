//! Metadata carried in run titles and result artifacts.
//!
//! The load test workflow names its runs like
//! `Test test_1717_x1y2 | Network: dev | Groups: 10 | Inbox: 3f9a...`.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Test configuration recovered from a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inbox_id: Option<String>,
}

impl RunMetadata {
    pub fn is_empty(&self) -> bool {
        self.network.is_none() && self.groups.is_none() && self.inbox_id.is_none()
    }

    /// Layer `overlay` on top of `self`; fields set in `overlay` win.
    pub fn layered(self, overlay: RunMetadata) -> RunMetadata {
        RunMetadata {
            network: overlay.network.or(self.network),
            groups: overlay.groups.or(self.groups),
            inbox_id: overlay.inbox_id.or(self.inbox_id),
        }
    }
}

/// Measurements only a result artifact can provide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_messages: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages_per_second: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dms: Option<u32>,
}

impl TestMetrics {
    pub fn layered(self, overlay: TestMetrics) -> TestMetrics {
        TestMetrics {
            total_messages: overlay.total_messages.or(self.total_messages),
            messages_per_second: overlay.messages_per_second.or(self.messages_per_second),
            dms: overlay.dms.or(self.dms),
        }
    }
}

/// What a results JSON file says about its run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactReport {
    pub metadata: RunMetadata,
    pub metrics: TestMetrics,
}

impl ArtifactReport {
    /// Read the known fields out of a results object, ignoring anything
    /// missing or mistyped. `messagesPerSecond` may be a number or a numeric
    /// string.
    pub fn from_json(data: &Map<String, Value>) -> Self {
        let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
        let count = |key: &str| data.get(key).and_then(Value::as_u64);
        let small = |key: &str| count(key).and_then(|v| u32::try_from(v).ok());

        let messages_per_second = match data.get("messagesPerSecond") {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite());

        ArtifactReport {
            metadata: RunMetadata {
                network: text("network").filter(|s| !s.is_empty()),
                groups: small("groups"),
                inbox_id: text("inboxId").filter(|s| !s.is_empty()),
            },
            metrics: TestMetrics {
                total_messages: count("totalMessages"),
                messages_per_second,
                dms: small("dms"),
            },
        }
    }
}

struct TitlePatterns {
    network: Regex,
    groups: Regex,
    inbox: Regex,
}

fn patterns() -> &'static TitlePatterns {
    static PATTERNS: OnceLock<TitlePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| TitlePatterns {
        network: Regex::new(r"Network:\s*([A-Za-z0-9_]+)").expect("valid network pattern"),
        groups: Regex::new(r"Groups:\s*([0-9]+)").expect("valid groups pattern"),
        // Whole hex run. Inbox ids are 64 chars and must not be cut short.
        inbox: Regex::new(r"Inbox:\s*([a-f0-9]+)").expect("valid inbox pattern"),
    })
}

fn capture<'t>(re: &Regex, title: &'t str) -> Option<&'t str> {
    Some(re.captures(title)?.get(1)?.as_str())
}

/// Extract `Network:`, `Groups:` and `Inbox:` values from a run title.
/// Labels that are absent or malformed leave their field unset.
pub fn parse(title: &str) -> RunMetadata {
    let p = patterns();
    RunMetadata {
        network: capture(&p.network, title).map(str::to_string),
        groups: capture(&p.groups, title).and_then(|g| g.parse().ok()),
        inbox_id: capture(&p.inbox, title).map(str::to_string),
    }
}

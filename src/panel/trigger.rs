use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::{Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::LoadTestPanel;
use crate::error::PanelError;
use crate::reconcile::TestId;

/// Parameters of a new load test, as sent by the form.
///
/// Every field accepts a string or a number; the workflow receives strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRequest {
    #[serde(default, deserialize_with = "loose_string")]
    pub inbox_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub network: Option<String>,
    /// Seconds.
    #[serde(default, deserialize_with = "loose_string")]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub num_groups: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub num_dms: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub interval: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub messages_per_batch: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub test_id: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub existing_inbox_ids: Option<String>,
    #[serde(default, deserialize_with = "loose_string")]
    pub existing_group_names: Option<String>,
}

fn loose_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

fn inbox_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-f0-9]{64}$").expect("valid inbox id pattern"))
}

/// Inbox ids are 64 lowercase hex characters.
pub fn is_valid_inbox_id(inbox_id: &str) -> bool {
    inbox_id_pattern().is_match(inbox_id)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn or_default(value: &Option<String>, default: &str) -> String {
    present(value).unwrap_or(default).to_string()
}

impl TriggerRequest {
    /// Validate and turn into workflow inputs, filling defaults.
    pub fn into_inputs(self) -> Result<(TestId, BTreeMap<String, String>), PanelError> {
        let (inbox_id, test_id) = match (present(&self.inbox_id), present(&self.test_id)) {
            (Some(inbox), Some(test)) => (inbox.to_string(), TestId::new(test)),
            _ => return Err(PanelError::Validation("Missing required fields".to_string())),
        };
        if !is_valid_inbox_id(&inbox_id) {
            return Err(PanelError::Validation("Invalid inbox ID format".to_string()));
        }

        let inputs = BTreeMap::from([
            ("inbox_id".to_string(), inbox_id),
            ("network".to_string(), or_default(&self.network, "dev")),
            ("duration".to_string(), or_default(&self.duration, "30")),
            ("num_groups".to_string(), or_default(&self.num_groups, "5")),
            ("num_dms".to_string(), or_default(&self.num_dms, "5")),
            ("interval".to_string(), or_default(&self.interval, "1")),
            ("messages_per_batch".to_string(), or_default(&self.messages_per_batch, "3")),
            ("test_id".to_string(), test_id.to_string()),
            ("existing_inbox_ids".to_string(), or_default(&self.existing_inbox_ids, "")),
            ("existing_group_names".to_string(), or_default(&self.existing_group_names, "")),
        ]);
        Ok((test_id, inputs))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    pub success: bool,
    pub test_id: TestId,
    pub message: String,
}

impl LoadTestPanel {
    /// Dispatch a new load test run and return without waiting for it.
    pub async fn trigger(&self, request: TriggerRequest) -> Result<TriggerOutcome, PanelError> {
        let (test_id, inputs) = request.into_inputs()?;
        self.config.require_token()?;

        let github = &self.config.github;
        info!(
            %test_id,
            repository = %self.repository(),
            workflow = %github.workflow_file,
            ?inputs,
            "dispatching load test"
        );

        self.engine
            .dispatch(&github.workflow_file, &github.git_ref, &inputs)
            .await
            .map_err(|e| PanelError::upstream("Failed to trigger GitHub Action", e))?;

        Ok(TriggerOutcome {
            success: true,
            test_id,
            message: "Test started successfully".to_string(),
        })
    }
}

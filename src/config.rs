//! Panel configuration.
//!
//! Resolved once at startup from three layers: compiled-in defaults, an
//! optional TOML file, then the `GITHUB_*` environment variables. The result
//! is shared by every operation.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PanelError;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_PATH_ENV: &str = "LOADTEST_PANEL_CONFIG";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration for the panel process.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl PanelConfig {
    /// Load configuration from a TOML file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded panel configuration");
        Ok(config)
    }

    /// Resolve the effective configuration.
    ///
    /// `path` (or `LOADTEST_PANEL_CONFIG` when `path` is `None`) names an
    /// optional file; a file that cannot be loaded is logged and skipped.
    /// Environment variables are applied last.
    pub fn resolve(path: Option<&Path>) -> Self {
        let env_path = std::env::var(CONFIG_PATH_ENV).ok();
        let path = path.or(env_path.as_deref().map(Path::new));

        let mut config = match path {
            Some(path) => Self::load(path).unwrap_or_else(|e| {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "config file could not be loaded, using defaults"
                );
                Self::default()
            }),
            None => {
                debug!("no config file given, using compiled-in defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Overlay `GITHUB_TOKEN`, `GITHUB_OWNER` and `GITHUB_REPO`. Blank values
    /// are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(owner) = get("GITHUB_OWNER") {
            self.github.owner = owner;
        }
        if let Some(repo) = get("GITHUB_REPO") {
            self.github.repo = repo;
        }
    }

    /// The workflow engine credential. Every operation calls this first.
    pub fn require_token(&self) -> Result<&str, PanelError> {
        self.github
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(PanelError::Configuration)
    }
}

impl fmt::Debug for PanelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelConfig")
            .field("github", &self.github)
            .field("history", &self.history)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// GitHub
// ---------------------------------------------------------------------------

/// Where the load test workflow lives and how to reach it.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Bearer credential. Never logged.
    pub token: Option<String>,
    pub owner: String,
    pub repo: String,
    /// Workflow file name under `.github/workflows/`.
    pub workflow_file: String,
    /// Display name of the workflow, used when resolving its numeric id.
    pub workflow_name: String,
    /// Git ref the workflow is dispatched on.
    pub git_ref: String,
    pub api_base: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl GithubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Repository-relative path of the workflow file.
    pub fn workflow_path(&self) -> String {
        format!(".github/workflows/{}", self.workflow_file)
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: "andy-t-wang".to_string(),
            repo: "xmtp-load-test-web".to_string(),
            workflow_file: "load-test.yml".to_string(),
            workflow_name: "XMTP Load Test".to_string(),
            git_ref: "main".to_string(),
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GithubConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("workflow_file", &self.workflow_file)
            .field("workflow_name", &self.workflow_name)
            .field("git_ref", &self.git_ref)
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of runs whose artifacts are fetched at the same time.
    pub enrich_concurrency: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enrich_concurrency: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PanelConfig::default();
        assert_eq!(config.github.owner, "andy-t-wang");
        assert_eq!(config.github.repo, "xmtp-load-test-web");
        assert_eq!(config.github.workflow_path(), ".github/workflows/load-test.yml");
        assert_eq!(config.history.enrich_concurrency, 4);
    }

    #[test]
    fn test_missing_token_is_configuration_error() {
        let config = PanelConfig::default();
        assert!(matches!(config.require_token(), Err(PanelError::Configuration)));
    }

    #[test]
    fn test_env_overrides_and_blank_values() {
        let env: HashMap<&str, &str> = [
            ("GITHUB_TOKEN", "ghp_secret"),
            ("GITHUB_OWNER", "acme"),
            ("GITHUB_REPO", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = PanelConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.require_token().unwrap(), "ghp_secret");
        assert_eq!(config.github.owner, "acme");
        assert_eq!(config.github.repo, "xmtp-load-test-web");
    }

    #[test]
    fn test_debug_redacts_token() {
        let mut config = PanelConfig::default();
        config.github.token = Some("ghp_secret".into());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[github]\nowner = \"load-lab\"\ntimeout_secs = 5\n\n[history]\nenrich_concurrency = 2"
        )
        .unwrap();

        let config = PanelConfig::load(file.path()).unwrap();
        assert_eq!(config.github.owner, "load-lab");
        assert_eq!(config.github.repo, "xmtp-load-test-web");
        assert_eq!(config.github.timeout(), Duration::from_secs(5));
        assert_eq!(config.history.enrich_concurrency, 2);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(PanelConfig::load(Path::new("/nonexistent/panel.toml")).is_err());
    }
}

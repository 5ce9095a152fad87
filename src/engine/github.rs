//! GitHub Actions REST transport.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::{header, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{Artifact, EngineError, RunQuery, RunScope, Workflow, WorkflowEngine, WorkflowRun};
use crate::config::GithubConfig;

const ACCEPT: &str = "application/vnd.github.v3+json";

/// Keep at most this much of an error body for logs.
const ERROR_BODY_LIMIT: usize = 512;

#[derive(Deserialize)]
struct WorkflowsPage {
    #[serde(default)]
    workflows: Vec<Workflow>,
}

#[derive(Deserialize)]
struct RunsPage {
    #[serde(default)]
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize)]
struct ArtifactsPage {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

/// [`WorkflowEngine`] backed by the GitHub REST API for one repository.
pub struct GithubClient {
    http: Client,
    api_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("loadtest-panel/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token: config.token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{}", self.api_base, self.owner, self.repo, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.url(path))
            .header(header::ACCEPT, ACCEPT);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, path: &str, builder: RequestBuilder) -> Result<Response, EngineError> {
        let response = builder.send().await.map_err(|e| EngineError::Transport {
            endpoint: path.to_string(),
            source: e.without_url(),
        })?;

        let status = response.status();
        tracing::debug!(endpoint = %path, status = status.as_u16(), "github response");
        if status.is_success() {
            return Ok(response);
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > ERROR_BODY_LIMIT {
            let mut cut = ERROR_BODY_LIMIT;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        tracing::warn!(endpoint = %path, status = status.as_u16(), %body, "github call rejected");
        Err(EngineError::Status {
            endpoint: path.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        builder: RequestBuilder,
    ) -> Result<T, EngineError> {
        let response = self.send(path, builder).await?;
        response.json::<T>().await.map_err(|e| EngineError::Decode {
            endpoint: path.to_string(),
            reason: e.without_url().to_string(),
        })
    }
}

fn runs_path(scope: &RunScope) -> String {
    match scope {
        RunScope::Repository => "/actions/runs".to_string(),
        RunScope::WorkflowId(id) => format!("/actions/workflows/{}/runs", id),
        RunScope::WorkflowFile(file) => format!("/actions/workflows/{}/runs", file),
    }
}

#[async_trait::async_trait]
impl WorkflowEngine for GithubClient {
    async fn list_workflows(&self) -> Result<Vec<Workflow>, EngineError> {
        let path = "/actions/workflows";
        let page: WorkflowsPage = self.get_json(path, self.request(Method::GET, path)).await?;
        Ok(page.workflows)
    }

    async fn list_runs(&self, query: &RunQuery) -> Result<Vec<WorkflowRun>, EngineError> {
        let path = runs_path(&query.scope);
        let mut params = vec![("per_page", query.per_page.to_string())];
        if let Some(status) = &query.status {
            params.push(("status", status.clone()));
        }

        let builder = self
            .request(Method::GET, &path)
            .header(header::CACHE_CONTROL, "no-cache")
            .query(&params);
        let page: RunsPage = self.get_json(&path, builder).await?;
        Ok(page.workflow_runs)
    }

    async fn dispatch(
        &self,
        workflow: &str,
        git_ref: &str,
        inputs: &BTreeMap<String, String>,
    ) -> Result<(), EngineError> {
        let path = format!("/actions/workflows/{}/dispatches", workflow);
        let builder = self
            .request(Method::POST, &path)
            .json(&json!({ "ref": git_ref, "inputs": inputs }));
        self.send(&path, builder).await?;
        Ok(())
    }

    async fn cancel_run(&self, run_id: u64) -> Result<(), EngineError> {
        let path = format!("/actions/runs/{}/cancel", run_id);
        self.send(&path, self.request(Method::POST, &path)).await?;
        Ok(())
    }

    async fn list_artifacts(&self, run_id: u64) -> Result<Vec<Artifact>, EngineError> {
        let path = format!("/actions/runs/{}/artifacts", run_id);
        let page: ArtifactsPage = self.get_json(&path, self.request(Method::GET, &path)).await?;
        Ok(page.artifacts)
    }

    async fn download_artifact(&self, artifact_id: u64) -> Result<Bytes, EngineError> {
        let path = format!("/actions/artifacts/{}/zip", artifact_id);
        let response = self.send(&path, self.request(Method::GET, &path)).await?;
        response.bytes().await.map_err(|e| EngineError::Transport {
            endpoint: path,
            source: e.without_url(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_path_per_scope() {
        assert_eq!(runs_path(&RunScope::Repository), "/actions/runs");
        assert_eq!(runs_path(&RunScope::WorkflowId(42)), "/actions/workflows/42/runs");
        assert_eq!(
            runs_path(&RunScope::WorkflowFile("load-test.yml".into())),
            "/actions/workflows/load-test.yml/runs"
        );
    }

    #[test]
    fn test_url_joins_repository() {
        let config = GithubConfig {
            api_base: "https://ghe.example.com/api/v3/".into(),
            owner: "acme".into(),
            repo: "bench".into(),
            ..Default::default()
        };
        let client = GithubClient::new(&config).unwrap();
        assert_eq!(
            client.url("/actions/runs"),
            "https://ghe.example.com/api/v3/repos/acme/bench/actions/runs"
        );
    }

    #[test]
    fn test_runs_page_without_runs_key() {
        let page: RunsPage = serde_json::from_str(r#"{"total_count": 0}"#).unwrap();
        assert!(page.workflow_runs.is_empty());
    }
}

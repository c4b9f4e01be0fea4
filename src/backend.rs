//! Research backend client.
//!
//! [`ResearchBackend`] is the seam between the session logic and the
//! black-box research service. [`HttpBackend`] speaks the service's JSON API:
//!
//! - `POST /api/research` submits a task and returns its id
//! - `GET /api/research/{task_id}/status` reports progress
//! - `GET /api/health` and `GET /api/tasks` for diagnostics

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::BackendConfig;
use crate::error::{ResearchError, Result};
use crate::types::{HealthReport, ResearchRequest, TaskHandle, TaskListing, TaskStatus};

/// Operations the session needs from a research service.
#[async_trait]
pub trait ResearchBackend: Send + Sync {
    /// Start a research task.
    ///
    /// # Errors
    ///
    /// [`ResearchError::Network`] on transport failure,
    /// [`ResearchError::Http`] on a non-2xx answer and
    /// [`ResearchError::Protocol`] when the answer carries no task id.
    async fn submit(&self, request: &ResearchRequest) -> Result<TaskHandle>;

    /// Fetch the current status of a task. Same error mapping as
    /// [`ResearchBackend::submit`].
    async fn status(&self, handle: &TaskHandle) -> Result<TaskStatus>;
}

/// Body returned by `POST /api/research`.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    task_id: Option<String>,
}

/// HTTP implementation of [`ResearchBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Build a client for the backend described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Config`] if the base URL does not parse or
    /// the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ResearchError::Config(format!("invalid backend URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ResearchError::Config(format!(
                "backend URL cannot be a base: {}",
                config.base_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ResearchError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ResearchError::Config("backend URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET /api/health`.
    ///
    /// # Errors
    ///
    /// Same mapping as [`ResearchBackend::status`].
    pub async fn health(&self) -> Result<HealthReport> {
        let url = self.endpoint(&["api", "health"])?;
        self.get_json(url).await
    }

    /// `GET /api/tasks`.
    ///
    /// # Errors
    ///
    /// Same mapping as [`ResearchBackend::status`].
    pub async fn list_tasks(&self) -> Result<TaskListing> {
        let url = self.endpoint(&["api", "tasks"])?;
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(%url, error = %e, "backend request failed");
            ResearchError::Network(e.to_string())
        })?;
        decode(&url, response).await
    }
}

/// Check the status code, then parse the body as `T`.
async fn decode<T: DeserializeOwned>(url: &Url, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ResearchError::Network(format!("failed to read response body: {e}")))?;
    if !status.is_success() {
        warn!(%url, status = status.as_u16(), body = %truncate(&body, 200), "backend returned error status");
        return Err(ResearchError::Http {
            status: status.as_u16(),
        });
    }
    serde_json::from_str(&body).map_err(|e| {
        warn!(%url, error = %e, "backend returned unparseable body");
        ResearchError::Protocol(format!("unexpected response body: {e}"))
    })
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl ResearchBackend for HttpBackend {
    async fn submit(&self, request: &ResearchRequest) -> Result<TaskHandle> {
        let url = self.endpoint(&["api", "research"])?;
        debug!(topic = request.topic(), style = %request.response_style(), "submitting research task");
        let response = self
            .client
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!(%url, error = %e, "research submission failed");
                ResearchError::Network(e.to_string())
            })?;
        let body: SubmitResponse = decode(&url, response).await?;
        match body.task_id {
            Some(id) if !id.trim().is_empty() => {
                debug!(task_id = %id, "research task accepted");
                Ok(TaskHandle::new(id))
            }
            _ => Err(ResearchError::Protocol(
                "submission response did not include a task_id".into(),
            )),
        }
    }

    async fn status(&self, handle: &TaskHandle) -> Result<TaskStatus> {
        let url = self.endpoint(&["api", "research", &handle.task_id, "status"])?;
        self.get_json(url).await
    }
}

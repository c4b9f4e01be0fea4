//! Wire and domain types for the research backend API.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};

/// Message shown when a submission carries no topic.
pub const EMPTY_TOPIC_MESSAGE: &str = "Please enter a research topic";

/// How the backend should phrase its answer.
///
/// Serialised as its display string (`"Comprehensive"`, `"Beginner-friendly"`,
/// ...). Unknown strings are carried through as [`ResponseStyle::Custom`] so a
/// newer backend can offer styles this client does not know about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResponseStyle {
    #[default]
    Comprehensive,
    Concise,
    Technical,
    BeginnerFriendly,
    Custom(String),
}

impl ResponseStyle {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Comprehensive => "Comprehensive",
            Self::Concise => "Concise",
            Self::Technical => "Technical",
            Self::BeginnerFriendly => "Beginner-friendly",
            Self::Custom(s) => s,
        }
    }
}

impl fmt::Display for ResponseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ResponseStyle {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "comprehensive" => Self::Comprehensive,
            "concise" => Self::Concise,
            "technical" => Self::Technical,
            "beginner-friendly" | "beginner_friendly" | "beginner" => Self::BeginnerFriendly,
            _ => Self::Custom(s),
        }
    }
}

impl From<&str> for ResponseStyle {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<ResponseStyle> for String {
    fn from(style: ResponseStyle) -> Self {
        match style {
            ResponseStyle::Custom(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

/// A validated research submission. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchRequest {
    topic: String,
    response_style: ResponseStyle,
    include_sources: bool,
}

impl ResearchRequest {
    /// Build a request, trimming the topic.
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::Validation`] when the topic is empty after
    /// trimming.
    pub fn new(
        topic: &str,
        response_style: ResponseStyle,
        include_sources: bool,
    ) -> Result<Self> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ResearchError::Validation(EMPTY_TOPIC_MESSAGE.to_owned()));
        }
        Ok(Self {
            topic: topic.to_owned(),
            response_style,
            include_sources,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn response_style(&self) -> &ResponseStyle {
        &self.response_style
    }

    pub fn include_sources(&self) -> bool {
        self.include_sources
    }
}

/// Identifier of a submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
}

impl TaskHandle {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
        }
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.task_id)
    }
}

/// Lifecycle state reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    Searching,
    Scraping,
    Processing,
    Generating,
    Completed,
    Error,
    /// Anything else, e.g. `initializing` before the first step starts.
    Other(String),
}

impl TaskState {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Searching => "searching",
            Self::Scraping => "scraping",
            Self::Processing => "processing",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Other(s) => s,
        }
    }

    /// `completed` and `error` end a task.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for TaskState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "searching" => Self::Searching,
            "scraping" => Self::Scraping,
            "processing" => Self::Processing,
            "generating" => Self::Generating,
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Other(s),
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        match state {
            TaskState::Other(s) => s,
            other => other.as_str().to_owned(),
        }
    }
}

/// Statistics attached to a task. Missing fields read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskMetadata {
    /// Seconds spent by the backend.
    pub processing_time: f64,
    pub sources_count: u64,
    pub tokens_used: u64,
}

/// One poll response. Each response supersedes the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub status: TaskState,
    /// Raw percentage as sent; may fall outside `0..=100`.
    #[serde(default)]
    pub progress: i64,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub metadata: Option<TaskMetadata>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskStatus {
    /// A status with only the state and progress set.
    pub fn new(status: TaskState, progress: i64) -> Self {
        Self {
            status,
            progress,
            current_step: None,
            result: None,
            metadata: None,
            error: None,
        }
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.current_step = Some(step.into());
        self
    }

    pub fn with_metadata(mut self, metadata: TaskMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// What a finished task produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutcome {
    pub result: Option<String>,
    pub metadata: Option<TaskMetadata>,
}

impl From<TaskStatus> for TaskOutcome {
    fn from(status: TaskStatus) -> Self {
        Self {
            result: status.result,
            metadata: status.metadata,
        }
    }
}

/// `GET /api/health` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub active_tasks: u64,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// One entry of `GET /api/tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    #[serde(default)]
    pub topic: String,
    pub status: TaskState,
    #[serde(default)]
    pub progress: i64,
    /// Unix timestamp (seconds, fractional).
    #[serde(default)]
    pub start_time: Option<f64>,
}

/// `GET /api/tasks` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskListing {
    #[serde(default)]
    pub active_tasks: u64,
    #[serde(default)]
    pub tasks: Vec<TaskSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_trims_topic() {
        let req = ResearchRequest::new("  quantum computing \n", ResponseStyle::Concise, false);
        let req = match req {
            Ok(r) => r,
            Err(e) => unreachable!("valid topic rejected: {e}"),
        };
        assert_eq!(req.topic(), "quantum computing");
        assert_eq!(req.response_style(), &ResponseStyle::Concise);
        assert!(!req.include_sources());
    }

    #[test]
    fn blank_topic_is_rejected() {
        for topic in ["", "   ", "\n\t"] {
            match ResearchRequest::new(topic, ResponseStyle::default(), true) {
                Err(ResearchError::Validation(m)) => assert_eq!(m, EMPTY_TOPIC_MESSAGE),
                other => unreachable!("expected validation error, got {other:?}"),
            }
        }
    }

    #[test]
    fn request_serialises_to_api_body() {
        let req = ResearchRequest::new("rust", ResponseStyle::BeginnerFriendly, true);
        let Ok(req) = req else {
            unreachable!("valid topic rejected")
        };
        let json = serde_json::to_value(&req).unwrap_or_default();
        assert_eq!(
            json,
            serde_json::json!({
                "topic": "rust",
                "response_style": "Beginner-friendly",
                "include_sources": true
            })
        );
    }

    #[test]
    fn response_style_parses_loosely() {
        assert_eq!(ResponseStyle::from("concise"), ResponseStyle::Concise);
        assert_eq!(ResponseStyle::from("TECHNICAL"), ResponseStyle::Technical);
        assert_eq!(
            ResponseStyle::from("Beginner-friendly"),
            ResponseStyle::BeginnerFriendly
        );
        assert_eq!(
            ResponseStyle::from("Poetic"),
            ResponseStyle::Custom("Poetic".into())
        );
        assert_eq!(ResponseStyle::default().to_string(), "Comprehensive");
    }

    #[test]
    fn status_parses_with_missing_optionals() {
        let status: TaskStatus =
            serde_json::from_str(r#"{"status":"scraping","progress":40}"#).unwrap_or_else(|e| {
                unreachable!("parse failed: {e}")
            });
        assert_eq!(status.status, TaskState::Scraping);
        assert_eq!(status.progress, 40);
        assert!(status.result.is_none());
        assert!(status.metadata.is_none());
    }

    #[test]
    fn unknown_state_is_kept() {
        let status: TaskStatus = serde_json::from_str(
            r#"{"task_id":"t1","status":"initializing","progress":0,"current_step":"","metadata":{"sources_count":0}}"#,
        )
        .unwrap_or_else(|e| unreachable!("parse failed: {e}"));
        assert_eq!(status.status, TaskState::Other("initializing".into()));
        assert!(!status.status.is_terminal());
        assert_eq!(
            status.metadata,
            Some(TaskMetadata {
                processing_time: 0.0,
                sources_count: 0,
                tokens_used: 0,
            })
        );
    }

    #[test]
    fn completed_status_becomes_outcome() {
        let status = TaskStatus::new(TaskState::Completed, 100)
            .with_result("done")
            .with_metadata(TaskMetadata {
                processing_time: 12.5,
                sources_count: 7,
                tokens_used: 1800,
            });
        assert!(status.status.is_terminal());
        let outcome = TaskOutcome::from(status);
        assert_eq!(outcome.result.as_deref(), Some("done"));
        assert_eq!(outcome.metadata.map(|m| m.sources_count), Some(7));
    }

    #[test]
    fn task_listing_parses() {
        let listing: TaskListing = serde_json::from_str(
            r#"{"active_tasks":1,"tasks":[{"task_id":"a","topic":"rust","status":"processing","progress":70,"start_time":1700000000.5}]}"#,
        )
        .unwrap_or_else(|e| unreachable!("parse failed: {e}"));
        assert_eq!(listing.active_tasks, 1);
        assert_eq!(listing.tasks[0].status, TaskState::Processing);
        assert_eq!(listing.tasks[0].start_time, Some(1_700_000_000.5));
    }
}

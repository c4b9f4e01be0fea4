//! Error types for the research client.
//!
//! Each error variant carries a stable error code (SCREAMING_SNAKE_CASE)
//! that is included in the Display output and accessible via
//! [`ResearchError::code()`]. The Display text is for logs; what a person
//! sees comes from [`ResearchError::user_message()`].

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// The research request was rejected locally (e.g. empty topic).
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";

    /// The backend could not be reached or the request did not complete.
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";

    /// The backend answered with a non-success HTTP status.
    pub const HTTP_STATUS: &str = "HTTP_STATUS";

    /// The backend answered with a body that could not be understood.
    pub const PROTOCOL_ERROR: &str = "PROTOCOL_ERROR";

    /// No terminal status arrived within the polling budget.
    pub const TIMEOUT_ERROR: &str = "TIMEOUT_ERROR";

    /// The backend reported that the research task failed.
    pub const TASK_FAILED: &str = "TASK_FAILED";

    /// Invalid or unreadable configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";

    /// Local filesystem failure.
    pub const IO_ERROR: &str = "IO_ERROR";
}

/// Message shown for any failure talking to the backend.
pub const GENERIC_FAILURE_MESSAGE: &str = "An error occurred during research. Please try again.";

/// Message shown when polling gives up.
pub const TIMEOUT_MESSAGE: &str = "Research timeout - please try again";

/// Message used when the backend reports failure without saying why.
pub const TASK_FAILED_FALLBACK: &str = "Research failed";

/// Errors produced while running research tasks.
#[derive(Debug, thiserror::Error)]
pub enum ResearchError {
    /// The request was rejected before any network call.
    #[error("[{}] {}", error_codes::VALIDATION_FAILED, .0)]
    Validation(String),

    /// Transport failure, including a per-request timeout.
    #[error("[{}] {}", error_codes::NETWORK_ERROR, .0)]
    Network(String),

    /// Non-2xx response.
    #[error("[{}] backend returned HTTP {status}", error_codes::HTTP_STATUS)]
    Http { status: u16 },

    /// 2xx response whose body was not what the API promises.
    #[error("[{}] {}", error_codes::PROTOCOL_ERROR, .0)]
    Protocol(String),

    /// The attempt budget ran out before a terminal status.
    #[error("[{}] no terminal status after {attempts} polls", error_codes::TIMEOUT_ERROR)]
    Timeout { attempts: u32 },

    /// The backend reported `error` for the task.
    #[error("[{}] {}", error_codes::TASK_FAILED, .0)]
    Task(String),

    /// Invalid configuration.
    #[error("[{}] {}", error_codes::CONFIG_INVALID, .0)]
    Config(String),

    /// Filesystem error.
    #[error("[{}] {}", error_codes::IO_ERROR, .0)]
    Io(#[from] std::io::Error),
}

impl ResearchError {
    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => error_codes::VALIDATION_FAILED,
            Self::Network(_) => error_codes::NETWORK_ERROR,
            Self::Http { .. } => error_codes::HTTP_STATUS,
            Self::Protocol(_) => error_codes::PROTOCOL_ERROR,
            Self::Timeout { .. } => error_codes::TIMEOUT_ERROR,
            Self::Task(_) => error_codes::TASK_FAILED,
            Self::Config(_) => error_codes::CONFIG_INVALID,
            Self::Io(_) => error_codes::IO_ERROR,
        }
    }

    /// Non-empty text suitable for a notification.
    ///
    /// Backend communication failures collapse to one generic message; the
    /// detail stays in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(m) | Self::Config(m) => m.clone(),
            Self::Network(_) | Self::Http { .. } | Self::Protocol(_) => {
                GENERIC_FAILURE_MESSAGE.to_owned()
            }
            Self::Timeout { .. } => TIMEOUT_MESSAGE.to_owned(),
            Self::Task(m) if m.trim().is_empty() => TASK_FAILED_FALLBACK.to_owned(),
            Self::Task(m) => m.clone(),
            Self::Io(e) => format!("File error: {e}"),
        }
    }

    /// Build a [`ResearchError::Task`] from an optional server message.
    pub fn task(message: Option<&str>) -> Self {
        match message.map(str::trim) {
            Some(m) if !m.is_empty() => Self::Task(m.to_owned()),
            _ => Self::Task(TASK_FAILED_FALLBACK.to_owned()),
        }
    }
}

impl From<reqwest::Error> for ResearchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            Self::Http {
                status: status.as_u16(),
            }
        } else if e.is_decode() {
            Self::Protocol(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ResearchError>;

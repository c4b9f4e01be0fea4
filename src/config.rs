//! Configuration types for the research client.
//!
//! Loaded from `~/.config/professor/config.toml`; every section and field is
//! optional and falls back to its default. Command-line flags override file
//! values after loading.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};
use crate::types::ResponseStyle;

/// Default backend location (the research server's development address).
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfessorConfig {
    pub backend: BackendConfig,
    pub polling: PollingConfig,
    pub defaults: DefaultsConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

// ── Backend ──────────────────────────────────────────────────────────────

/// Where and how to reach the research backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL; API paths are appended to it.
    pub base_url: String,
    /// Per-request timeout. Bounds one hung request, not the whole task.
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            request_timeout_secs: 30,
            user_agent: format!("professor/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ── Polling ──────────────────────────────────────────────────────────────

/// Status polling cadence and budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between the end of one poll and the start of the next.
    pub interval_ms: u64,
    /// Polls allowed before giving up with a timeout.
    pub max_attempts: u32,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 300,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ── Form defaults ────────────────────────────────────────────────────────

/// Values the search form starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub response_style: ResponseStyle,
    pub include_sources: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            response_style: ResponseStyle::Comprehensive,
            include_sources: true,
        }
    }
}

// ── Output ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where downloads are written. `None` means the platform download
    /// directory.
    pub download_dir: Option<PathBuf>,
}

impl OutputConfig {
    /// Configured directory, else the platform download directory, else the
    /// working directory.
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

// ── Logging ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub filter: String,
    /// When set, logs are also written to a daily rolling file here.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "professor=info,professor_render=info".to_owned(),
            directory: None,
        }
    }
}

impl ProfessorConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ResearchError::Config(e.to_string()))
    }

    /// Load the file at `path` if it exists, otherwise return defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ResearchError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/professor/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("professor").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("professor")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/professor-config/config.toml")
        }
    }

    /// Validates this configuration.
    ///
    /// Checks:
    /// - `backend.base_url` is an absolute `http`/`https` URL
    /// - `backend.request_timeout_secs` is greater than 0
    /// - `polling.interval_ms` and `polling.max_attempts` are greater than 0
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.backend.base_url)
            .map_err(|e| ResearchError::Config(format!("backend.base_url is invalid: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ResearchError::Config(format!(
                "backend.base_url must use http or https, got {}",
                url.scheme()
            )));
        }
        if self.backend.request_timeout_secs == 0 {
            return Err(ResearchError::Config(
                "backend.request_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.polling.interval_ms == 0 {
            return Err(ResearchError::Config(
                "polling.interval_ms must be greater than 0".into(),
            ));
        }
        if self.polling.max_attempts == 0 {
            return Err(ResearchError::Config(
                "polling.max_attempts must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

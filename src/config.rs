//! Project configuration stored in `.strata/config.yaml`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProjectError;
use crate::ports::filesystem::FileSystem;
use crate::project::builder::TokenBudget;
use crate::workspace::execution::MARKER_DIR;
use crate::workspace::matcher::validate_pattern;

/// File name of the configuration inside the marker directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Summarizer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// Anthropic messages API.
    #[default]
    Anthropic,
    /// OpenAI chat completions API.
    OpenAi,
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown provider {other:?} (expected anthropic or openai)")),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anthropic => f.write_str("anthropic"),
            Self::OpenAi => f.write_str("openai"),
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive, e.g. `info` or `strata=debug`.
    #[serde(default = "default_level")]
    pub level: String,
    /// Log full summarizer prompts and responses at debug level.
    #[serde(default)]
    pub request_response_debug: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level(), request_response_debug: false }
    }
}

/// Project configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Summarizer backend name.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model override; the provider's default model when absent.
    #[serde(default)]
    pub model: Option<String>,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Module size bounds.
    #[serde(default)]
    pub budget: TokenBudget,
    /// Extra exclusion patterns applied when building metadata.
    #[serde(default)]
    pub exclusions: Vec<String>,
}

fn default_provider() -> String {
    Provider::default().to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            logging: LoggingConfig::default(),
            budget: TokenBudget::default(),
            exclusions: Vec::new(),
        }
    }
}

impl Config {
    /// Default configuration for the given provider name.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Config`] for an unknown provider.
    pub fn with_provider(name: Option<&str>) -> Result<Self, ProjectError> {
        let provider = match name {
            Some(name) => name.parse::<Provider>().map_err(ProjectError::Config)?,
            None => Provider::default(),
        };
        Ok(Self { provider: provider.to_string(), ..Self::default() })
    }

    /// Turns request and response logging on when `flag` is set; the
    /// configured value stands otherwise.
    #[must_use]
    pub fn with_payload_debug(mut self, flag: bool) -> Self {
        self.logging.request_response_debug |= flag;
        self
    }

    /// Path of the configuration file for a project root.
    #[must_use]
    pub fn path(project_root: &Path) -> PathBuf {
        project_root.join(MARKER_DIR).join(CONFIG_FILE)
    }

    /// Loads and validates the configuration, falling back to defaults when
    /// the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(fs: &dyn FileSystem, project_root: &Path) -> Result<Self, ProjectError> {
        let path = Self::path(project_root);
        if !fs.exists(&path) {
            debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }
        let text = fs
            .read_to_string(&path)
            .map_err(|e| ProjectError::io(format!("failed to read {}", path.display()), e))?;
        let config: Self = serde_yaml::from_str(&text)
            .map_err(|e| ProjectError::yaml(format!("failed to parse {}", path.display()), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, fs: &dyn FileSystem, project_root: &Path) -> Result<(), ProjectError> {
        let path = Self::path(project_root);
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| ProjectError::yaml("failed to serialize configuration", e))?;
        fs.write(&path, &yaml)
            .map_err(|e| ProjectError::io(format!("failed to write {}", path.display()), e))
    }

    /// Checks provider, budget and exclusion patterns.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Config`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ProjectError> {
        self.provider()?;
        self.budget.validate().map_err(ProjectError::Config)?;
        for pattern in &self.exclusions {
            validate_pattern(pattern)
                .map_err(|e| ProjectError::Config(format!("exclusions: {e}")))?;
        }
        Ok(())
    }

    /// Parsed provider.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::Config`] for an unknown provider name.
    pub fn provider(&self) -> Result<Provider, ProjectError> {
        self.provider.parse().map_err(ProjectError::Config)
    }
}

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Environment variable consulted for the API key when no flag is given
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

/// The fixed set of selectable model identifiers
///
/// The default is deliberately the second entry of the list, matching the
/// order the identifiers are presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "gemini-3-pro-image-preview")]
    ProImagePreview,
    #[default]
    #[serde(rename = "gemini-3-flash-preview")]
    FlashPreview,
    #[serde(rename = "gemini-3-pro-preview")]
    ProPreview,
}

impl ModelId {
    pub const VALUES: &[ModelId] = &[ModelId::ProImagePreview, ModelId::FlashPreview, ModelId::ProPreview];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::ProImagePreview => "gemini-3-pro-image-preview",
            ModelId::FlashPreview => "gemini-3-flash-preview",
            ModelId::ProPreview => "gemini-3-pro-preview",
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ModelId::VALUES
            .iter()
            .find(|m| m.as_str() == s.trim())
            .copied()
            .ok_or_else(|| Error::Config(format!("unknown model '{}', expected one of: {}", s, model_list())))
    }
}

fn model_list() -> String {
    ModelId::VALUES.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
}

/// File logging settings from the `[logging.file]` section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileLoggingSettings {
    /// Enable file logging to the log directory
    #[serde(default)]
    pub enabled: bool,
}

/// Logging settings from the `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Default log level for stderr output
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `pretty`, `json`, or `compact`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// File logging configuration
    #[serde(default)]
    pub file: FileLoggingSettings,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format(), file: FileLoggingSettings::default() }
    }
}

/// Root configuration structure for config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// API key (optional; flags and the environment take precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model to chat with
    #[serde(default)]
    pub model: ModelId,

    /// Base URL for the API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature passed with every request
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: ModelId::default(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).map_err(|e| Error::Config(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base_url must not be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(Error::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if let Some(key) = &self.api_key
            && key.trim().is_empty()
        {
            return Err(Error::Config("api_key must not be blank; omit it instead".to_string()));
        }

        Ok(())
    }

    /// An example config.toml, written on `cirrus init`
    pub fn example() -> &'static str {
        r#"# Cirrus configuration
#
# The API key can also come from the --key flag or the GEMINI_API_KEY
# environment variable; both take precedence over this file.
# api_key = "your-api-key"

model = "gemini-3-flash-preview"
base_url = "https://generativelanguage.googleapis.com/v1beta"
temperature = 0.7

[logging]
level = "warn"
format = "pretty"

[logging.file]
enabled = false
"#
    }
}

/// Resolve the API key: flag, then environment, then config file.
///
/// Blank strings at any level are treated as absent.
pub fn resolve_api_key(flag: Option<&str>, config: &Config) -> Option<String> {
    let non_blank = |s: &str| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    };

    flag.and_then(non_blank)
        .or_else(|| std::env::var(API_KEY_ENV).ok().as_deref().and_then(non_blank))
        .or_else(|| config.api_key.as_deref().and_then(non_blank))
}

/// Mask an API key for display: bullets plus the last four characters.
///
/// Short keys are masked entirely so nothing useful leaks into the UI.
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "••••••••".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("••••{}", tail)
}

//! Configuration management for rill pipelines.
//!
//! Parses `rill.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! ```toml
//! [tokenizer]
//! emit_inline_tokens = true
//!
//! [recovery]
//! max_fragment_bytes = 65536
//! directive_timeout_ms = 30000
//! unknown_directive = "fallback-text"   # or "fallback-code-block", "ignore"
//! body_cache_capacity = 256
//! ```
//!
//! Every field is optional; missing fields take the pipeline defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rill_stream::{
    DEFAULT_BODY_CACHE_CAPACITY, DEFAULT_DIRECTIVE_TIMEOUT, DEFAULT_MAX_FRAGMENT_BYTES,
    PipelineOptions, RecoveryConfig, UnknownDirectiveMode,
};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "rill.toml";

/// Pipeline configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tokenizer configuration.
    pub tokenizer: TokenizerConfig,
    /// Recovery policy configuration.
    pub recovery: RecoverySection,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Tokenizer configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Split block content into inline spans.
    pub emit_inline_tokens: bool,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            emit_inline_tokens: true,
        }
    }
}

/// `[recovery]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecoverySection {
    /// Fragments longer than this many bytes are truncated.
    pub max_fragment_bytes: usize,
    /// Milliseconds a directive may stay open before it is forced to `error`.
    pub directive_timeout_ms: u64,
    /// Fallback for directives with an invalid name.
    pub unknown_directive: UnknownDirectiveMode,
    /// Number of parsed directive bodies kept in the cache.
    pub body_cache_capacity: usize,
}

impl Default for RecoverySection {
    fn default() -> Self {
        Self {
            max_fragment_bytes: DEFAULT_MAX_FRAGMENT_BYTES,
            directive_timeout_ms: u64::try_from(DEFAULT_DIRECTIVE_TIMEOUT.as_millis())
                .unwrap_or(u64::MAX),
            unknown_directive: UnknownDirectiveMode::default(),
            body_cache_capacity: DEFAULT_BODY_CACHE_CAPACITY,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

/// Require a numeric field to be non-zero.
fn require_non_zero(value: usize, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `rill.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, or if reading,
    /// parsing or validation fails.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::load_from_file(path);
        }

        let discovered = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd));
        match discovered {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate configuration text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed TOML and
    /// `ConfigError::Validation` for out-of-range values.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_zero(self.recovery.max_fragment_bytes, "recovery.max_fragment_bytes")?;
        require_non_zero(
            self.recovery.body_cache_capacity,
            "recovery.body_cache_capacity",
        )?;
        Ok(())
    }

    /// Convert to the options record a pipeline is constructed with.
    #[must_use]
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            emit_inline_tokens: self.tokenizer.emit_inline_tokens,
            recovery: RecoveryConfig {
                max_fragment_bytes: self.recovery.max_fragment_bytes,
                directive_timeout: Duration::from_millis(self.recovery.directive_timeout_ms),
                unknown_directive: self.recovery.unknown_directive,
                body_cache_capacity: self.recovery.body_cache_capacity,
            },
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }
}

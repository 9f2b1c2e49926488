//! Pipeline and recovery options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default byte limit for a single pushed fragment.
pub const DEFAULT_MAX_FRAGMENT_BYTES: usize = 64 * 1024;

/// Default time a directive may stay open before it is forced to `error`.
pub const DEFAULT_DIRECTIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of parsed directive bodies kept in the recovery cache.
pub const DEFAULT_BODY_CACHE_CAPACITY: usize = 256;

/// What to produce for a directive whose header fails the name grammar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownDirectiveMode {
    /// Open a directive named `unknown`, flagged as recovered.
    #[default]
    FallbackText,
    /// Render the header and body verbatim as a code block.
    FallbackCodeBlock,
    /// Consume the block without producing a node.
    Ignore,
}

/// Recovery policy configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Fragments longer than this (in UTF-8 bytes) are truncated.
    pub max_fragment_bytes: usize,
    /// Directives open longer than this are forced to `error`.
    pub directive_timeout: Duration,
    pub unknown_directive: UnknownDirectiveMode,
    /// Capacity of the parsed-body cache (least recently used entries evicted).
    pub body_cache_capacity: usize,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_fragment_bytes: DEFAULT_MAX_FRAGMENT_BYTES,
            directive_timeout: DEFAULT_DIRECTIVE_TIMEOUT,
            unknown_directive: UnknownDirectiveMode::default(),
            body_cache_capacity: DEFAULT_BODY_CACHE_CAPACITY,
        }
    }
}

/// Options for a [`Pipeline`](crate::Pipeline).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Run the inline span tokenizer over block content.
    ///
    /// When disabled, each block line yields a single text event.
    pub emit_inline_tokens: bool,
    pub recovery: RecoveryConfig,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            emit_inline_tokens: true,
            recovery: RecoveryConfig::default(),
        }
    }
}

impl PipelineOptions {
    #[must_use]
    pub fn with_emit_inline_tokens(mut self, enabled: bool) -> Self {
        self.emit_inline_tokens = enabled;
        self
    }

    #[must_use]
    pub fn with_max_fragment_bytes(mut self, bytes: usize) -> Self {
        self.recovery.max_fragment_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_directive_timeout(mut self, timeout: Duration) -> Self {
        self.recovery.directive_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_unknown_directive(mut self, mode: UnknownDirectiveMode) -> Self {
        self.recovery.unknown_directive = mode;
        self
    }

    #[must_use]
    pub fn with_body_cache_capacity(mut self, capacity: usize) -> Self {
        self.recovery.body_cache_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = PipelineOptions::default();
        assert!(options.emit_inline_tokens);
        assert_eq!(options.recovery.max_fragment_bytes, 65_536);
        assert_eq!(options.recovery.directive_timeout, Duration::from_secs(30));
        assert_eq!(
            options.recovery.unknown_directive,
            UnknownDirectiveMode::FallbackText
        );
    }

    #[test]
    fn test_builder_methods() {
        let options = PipelineOptions::default()
            .with_emit_inline_tokens(false)
            .with_max_fragment_bytes(32)
            .with_directive_timeout(Duration::from_millis(5))
            .with_unknown_directive(UnknownDirectiveMode::Ignore)
            .with_body_cache_capacity(4);

        assert!(!options.emit_inline_tokens);
        assert_eq!(options.recovery.max_fragment_bytes, 32);
        assert_eq!(options.recovery.directive_timeout, Duration::from_millis(5));
        assert_eq!(options.recovery.unknown_directive, UnknownDirectiveMode::Ignore);
        assert_eq!(options.recovery.body_cache_capacity, 4);
    }

    #[test]
    fn test_unknown_mode_deserializes_kebab_case() {
        let mode: UnknownDirectiveMode = serde_yaml::from_str("fallback-code-block").unwrap();
        assert_eq!(mode, UnknownDirectiveMode::FallbackCodeBlock);
    }
}

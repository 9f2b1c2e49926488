//! Recovery policy.
//!
//! The [`RecoveryManager`] decides what the pipeline does instead of failing:
//! it sanitizes fragments, recovers attributes from malformed directive
//! bodies, detects stuck directives, and reports each decision to an optional
//! [`RecoveryObserver`]. Every report is also logged at `warn` level.
//!
//! Nothing here returns an error to the caller; each method yields a usable
//! fallback value.

mod body;
mod event;

use std::borrow::Cow;
use std::sync::mpsc::Sender;
use std::time::Duration;

pub use body::{Attributes, BodyParseError, parse_body};
pub use event::{RecoveryEvent, RecoveryKind};

use body::{BodyCache, Recovered};

use crate::{Position, RecoveryConfig, UnknownDirectiveMode};

/// Receives recovery events.
///
/// Implemented for closures taking `&RecoveryEvent` and for
/// `mpsc::Sender<RecoveryEvent>` (a disconnected receiver is ignored).
pub trait RecoveryObserver {
    fn on_recovery(&self, event: &RecoveryEvent);
}

impl<F> RecoveryObserver for F
where
    F: Fn(&RecoveryEvent),
{
    fn on_recovery(&self, event: &RecoveryEvent) {
        self(event);
    }
}

impl RecoveryObserver for Sender<RecoveryEvent> {
    fn on_recovery(&self, event: &RecoveryEvent) {
        let _ = self.send(event.clone());
    }
}

/// Recovery decision policy.
pub struct RecoveryManager {
    config: RecoveryConfig,
    observer: Option<Box<dyn RecoveryObserver>>,
    cache: BodyCache,
}

impl RecoveryManager {
    #[must_use]
    pub fn new(config: RecoveryConfig) -> Self {
        let cache = BodyCache::new(config.body_cache_capacity);
        Self {
            config,
            observer: None,
            cache,
        }
    }

    /// Attach an observer, replacing any previous one.
    #[must_use]
    pub fn with_observer(mut self, observer: impl RecoveryObserver + 'static) -> Self {
        self.set_observer(observer);
        self
    }

    pub fn set_observer(&mut self, observer: impl RecoveryObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Sanitize a text fragment.
    ///
    /// Strips NUL characters and truncates fragments longer than
    /// `max_fragment_bytes` at the nearest preceding character boundary.
    pub fn validate_input<'a>(&self, fragment: &'a str) -> Cow<'a, str> {
        let mut sanitized = if fragment.contains('\0') {
            Cow::Owned(fragment.replace('\0', ""))
        } else {
            Cow::Borrowed(fragment)
        };

        let limit = self.config.max_fragment_bytes;
        if sanitized.len() > limit {
            let original = sanitized.len();
            sanitized = match sanitized {
                Cow::Borrowed(s) => Cow::Borrowed(truncate_to_char_boundary(s, limit)),
                Cow::Owned(s) => Cow::Owned(truncate_to_char_boundary(&s, limit).to_owned()),
            };
            self.report(RecoveryEvent::new(
                RecoveryKind::BufferOverflow,
                format!(
                    "Truncated {original}-byte fragment to {} bytes.",
                    sanitized.len()
                ),
            ));
        }

        sanitized
    }

    /// Report a fragment that was dropped as malformed.
    pub fn report_invalid_input(&self, action: impl Into<String>) {
        self.report(RecoveryEvent::new(RecoveryKind::InvalidInput, action));
    }

    /// Recover attributes from an accumulated directive body.
    ///
    /// Returns the parsed attributes, or `last_good` unchanged if neither the
    /// body nor any of its backoff prefixes parse as a mapping.
    pub fn recover_body(
        &mut self,
        body: &str,
        last_good: &Attributes,
        position: Option<Position>,
    ) -> Attributes {
        if let Some(cached) = self.cache.get(body) {
            return cached.clone();
        }

        match body::recover(body) {
            Recovered::Parsed(attributes) => {
                self.cache.insert(body, attributes.clone());
                attributes
            }
            Recovered::NotMapping => last_good.clone(),
            Recovered::Failed(error) => {
                let mut event = RecoveryEvent::new(
                    RecoveryKind::YamlParseError,
                    "Kept last valid attributes.",
                )
                .with_message(format!("{} ({error})", RecoveryKind::YamlParseError.message()));
                event.position = position;
                self.report(event);
                last_good.clone()
            }
        }
    }

    /// Check whether a directive has been open longer than the timeout.
    ///
    /// Reports `unclosed-directive` when it has.
    pub fn check_directive_timeout(&self, elapsed: Duration, position: Option<Position>) -> bool {
        let timed_out = elapsed > self.config.directive_timeout;
        if timed_out {
            let mut event = RecoveryEvent::new(
                RecoveryKind::UnclosedDirective,
                "Marked directive as errored and recovered due to timeout.",
            );
            event.position = position;
            self.report(event);
        }
        timed_out
    }

    pub fn report_invalid_directive(&self, position: Position) {
        let action = match self.config.unknown_directive {
            UnknownDirectiveMode::FallbackText => "Opened directive as \"unknown\".",
            UnknownDirectiveMode::FallbackCodeBlock => "Rendered directive as code block.",
            UnknownDirectiveMode::Ignore => "Dropped directive content.",
        };
        self.report(RecoveryEvent::new(RecoveryKind::InvalidDirectiveName, action).at(position));
    }

    /// Report a directive force-closed because the stream ended.
    pub fn report_unclosed_at_end(&self, position: Option<Position>) {
        let mut event = RecoveryEvent::new(
            RecoveryKind::UnclosedDirective,
            "Marked directive complete and recovered at stream end.",
        );
        event.position = position;
        self.report(event);
    }

    /// Drop cached body parses.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    fn report(&self, event: RecoveryEvent) {
        match event.position {
            Some(position) => tracing::warn!(
                kind = %event.kind,
                action = %event.recovery_action,
                line = position.line,
                column = position.column,
                "{}",
                event.message
            ),
            None => tracing::warn!(
                kind = %event.kind,
                action = %event.recovery_action,
                "{}",
                event.message
            ),
        }

        if let Some(observer) = &self.observer {
            observer.on_recovery(&event);
        }
    }
}

impl Default for RecoveryManager {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}

impl std::fmt::Debug for RecoveryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryManager")
            .field("config", &self.config)
            .field("observer", &self.observer.is_some())
            .field("cached_bodies", &self.cache.len())
            .finish()
    }
}

/// Longest prefix of `s` that fits in `max_bytes` without splitting a
/// character.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

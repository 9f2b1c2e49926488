//! Recovery events reported to observers.

use serde::Serialize;

use crate::Position;

/// Kind of recoverable condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryKind {
    /// Malformed fragment (invalid UTF-8 bytes or a dangling partial character).
    InvalidInput,
    /// Fragment exceeded the byte limit and was truncated.
    BufferOverflow,
    /// Directive body could not be parsed; last-good attributes kept.
    YamlParseError,
    /// Directive timed out or was force-closed at stream end.
    UnclosedDirective,
    /// Directive header failed the name grammar.
    InvalidDirectiveName,
    /// Inline markup without a closer. Handled by the inline tokenizer
    /// leaving the characters as text, so it is never reported today.
    UnclosedInline,
}

impl RecoveryKind {
    /// Stable identifier, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid-input",
            Self::BufferOverflow => "buffer-overflow",
            Self::YamlParseError => "yaml-parse-error",
            Self::UnclosedDirective => "unclosed-directive",
            Self::InvalidDirectiveName => "invalid-directive-name",
            Self::UnclosedInline => "unclosed-inline",
        }
    }

    /// Default human-readable message.
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidInput => "Invalid chunk input. Ignoring malformed value.",
            Self::BufferOverflow => "Parser buffer exceeded limit. Forcing partial flush.",
            Self::YamlParseError => "YAML parsing failed. Falling back to last valid attributes.",
            Self::UnclosedDirective => "Directive was not closed. Auto-closing at stream end.",
            Self::InvalidDirectiveName => {
                "Directive name is invalid. Falling back to text behavior."
            }
            Self::UnclosedInline => "Inline markup appears unclosed. Falling back to plain text.",
        }
    }
}

impl std::fmt::Display for RecoveryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recovery report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryEvent {
    pub kind: RecoveryKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// What the parser did instead of failing.
    pub recovery_action: String,
}

impl RecoveryEvent {
    pub fn new(kind: RecoveryKind, action: impl Into<String>) -> Self {
        Self {
            kind,
            message: kind.message().to_owned(),
            position: None,
            recovery_action: action.into(),
        }
    }

    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_match_serde() {
        for kind in [
            RecoveryKind::InvalidInput,
            RecoveryKind::BufferOverflow,
            RecoveryKind::YamlParseError,
            RecoveryKind::UnclosedDirective,
            RecoveryKind::InvalidDirectiveName,
            RecoveryKind::UnclosedInline,
        ] {
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, serde_json::Value::String(kind.as_str().to_owned()));
        }
    }

    #[test]
    fn test_event_serialization() {
        let event = RecoveryEvent::new(RecoveryKind::BufferOverflow, "Truncated to 8 bytes")
            .at(Position::START);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "buffer-overflow");
        assert_eq!(json["recoveryAction"], "Truncated to 8 bytes");
        assert_eq!(json["position"]["line"], 1);
    }

    #[test]
    fn test_event_without_position_omits_field() {
        let event = RecoveryEvent::new(RecoveryKind::InvalidInput, "Ignored fragment");
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("position").is_none());
    }
}

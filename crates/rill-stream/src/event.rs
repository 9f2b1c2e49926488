//! Parse events emitted by the streaming tokenizer.

use serde::Serialize;

use crate::Position;

/// Kind of parse event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Text,
    Bold,
    Italic,
    CodeInline,
    Link,
    Image,
    Paragraph,
    Heading,
    ListItem,
    Blockquote,
    Hr,
    Newline,
    CodeBlockStart,
    CodeBlockContent,
    CodeBlockEnd,
    DirectiveOpen,
    DirectiveBody,
    DirectiveClose,
}

/// A single tokenizer event.
///
/// Events are produced once and never replayed. `raw` holds the source text
/// the event was derived from (a whole line for block events, the matched
/// span for inline events).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParseEvent {
    pub kind: EventKind,
    pub raw: String,
    pub position: Position,
}

impl ParseEvent {
    /// Whether this is a close event synthesized at end of stream rather
    /// than read from a closing line.
    pub fn is_synthesized_close(&self) -> bool {
        matches!(self.kind, EventKind::CodeBlockEnd | EventKind::DirectiveClose) && self.raw.is_empty()
    }

    pub fn new(kind: EventKind, raw: impl Into<String>, position: Position) -> Self {
        Self {
            kind,
            raw: raw.into(),
            position,
        }
    }
}

//! Streaming line tokenizer.
//!
//! Consumes text fragments of any size, buffers the trailing partial line
//! across calls, and classifies each completed line into [`ParseEvent`]s.
//!
//! Two states override ordinary line dispatch until their closing marker
//! appears on a later whole line: an open code fence and an open directive
//! body. Inside either, every line is passed through verbatim, so directive
//! markers inside a fence are inert and a body value containing `:::` does
//! not close the directive.

use std::collections::VecDeque;

use crate::block::{
    is_closing_fence, is_directive_close, is_directive_open, is_horizontal_rule,
    parse_blockquote, parse_code_fence, parse_heading, parse_list_item,
};
use crate::inline::tokenize_inline;
use crate::{EventKind, ParseEvent, Position};

/// Persistent tokenizer state across lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    /// Ordinary line dispatch.
    Idle,
    /// Inside a code fence opened with `len` backticks.
    CodeFence { len: usize },
    /// Inside a directive body.
    DirectiveBody,
}

/// Incremental tokenizer for one document.
///
/// # Example
///
/// ```
/// use rill_stream::{EventKind, StreamTokenizer};
///
/// let mut tokenizer = StreamTokenizer::new();
/// let mut kinds: Vec<EventKind> = tokenizer.feed("# Ti").map(|e| e.kind).collect();
/// assert!(kinds.is_empty());
///
/// kinds.extend(tokenizer.feed("tle\n").map(|e| e.kind));
/// assert_eq!(kinds, vec![EventKind::Heading, EventKind::Text]);
/// ```
#[derive(Debug)]
pub struct StreamTokenizer {
    state: BlockState,
    line_buffer: String,
    line_start: Position,
    position: Position,
    emit_inline_tokens: bool,
}

impl StreamTokenizer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_inline_tokens(true)
    }

    /// Create a tokenizer, choosing whether block content is split into
    /// inline spans or emitted as a single text event.
    #[must_use]
    pub fn with_inline_tokens(emit_inline_tokens: bool) -> Self {
        Self {
            state: BlockState::Idle,
            line_buffer: String::new(),
            line_start: Position::START,
            position: Position::START,
            emit_inline_tokens,
        }
    }

    /// Feed a fragment and iterate the events for every line it completes.
    ///
    /// The iterator is lazy and can be dropped early: the remainder of the
    /// fragment is still consumed (its events discarded) so the next call
    /// sees consistent state.
    pub fn feed<'a>(&'a mut self, fragment: &'a str) -> Events<'a> {
        Events {
            tokenizer: self,
            rest: fragment,
            pending: VecDeque::new(),
            flush: false,
        }
    }

    /// Signal end of stream.
    ///
    /// Emits events for the buffered partial line, then synthesizes the
    /// close event for a still-open code fence or directive body. A
    /// synthesized close has no source text, so its `raw` is empty.
    pub fn flush(&mut self) -> Events<'_> {
        Events {
            tokenizer: self,
            rest: "",
            pending: VecDeque::new(),
            flush: true,
        }
    }

    /// Discard all buffered state and start a new document.
    pub fn reset(&mut self) {
        self.state = BlockState::Idle;
        self.line_buffer.clear();
        self.line_start = Position::START;
        self.position = Position::START;
    }

    /// Position just after the last consumed character.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn in_code_block(&self) -> bool {
        matches!(self.state, BlockState::CodeFence { .. })
    }

    pub fn in_directive(&self) -> bool {
        self.state == BlockState::DirectiveBody
    }

    /// Consume input up to and including the next newline.
    fn advance(&mut self, rest: &mut &str, out: &mut VecDeque<ParseEvent>) {
        let Some(newline) = rest.find('\n') else {
            self.position.advance_str(rest);
            self.line_buffer.push_str(rest);
            *rest = "";
            return;
        };

        let (segment, tail) = rest.split_at(newline + 1);
        *rest = tail;
        self.position.advance_str(segment);
        self.line_buffer.push_str(&segment[..newline]);

        let line = std::mem::take(&mut self.line_buffer);
        let start = std::mem::replace(&mut self.line_start, self.position);
        self.process_line(&line, start, true, out);
    }

    fn finish(&mut self, out: &mut VecDeque<ParseEvent>) {
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            let start = std::mem::replace(&mut self.line_start, self.position);
            self.process_line(&line, start, false, out);
        }

        match self.state {
            BlockState::CodeFence { .. } => {
                tracing::debug!(line = self.position.line, "Force-closing code fence at end of stream");
                out.push_back(ParseEvent::new(EventKind::CodeBlockEnd, "", self.position));
            }
            BlockState::DirectiveBody => {
                tracing::debug!(line = self.position.line, "Force-closing directive at end of stream");
                out.push_back(ParseEvent::new(EventKind::DirectiveClose, "", self.position));
            }
            BlockState::Idle => {}
        }
        self.state = BlockState::Idle;
    }

    fn process_line(
        &mut self,
        line: &str,
        at: Position,
        has_newline: bool,
        out: &mut VecDeque<ParseEvent>,
    ) {
        let line = line.strip_suffix('\r').unwrap_or(line);

        match self.state {
            BlockState::CodeFence { len } => {
                if is_closing_fence(line, len) {
                    out.push_back(ParseEvent::new(EventKind::CodeBlockEnd, line, at));
                    self.state = BlockState::Idle;
                } else {
                    out.push_back(ParseEvent::new(EventKind::CodeBlockContent, line, at));
                }
                return;
            }
            BlockState::DirectiveBody => {
                if is_directive_close(line) {
                    out.push_back(ParseEvent::new(EventKind::DirectiveClose, line, at));
                    self.state = BlockState::Idle;
                } else {
                    out.push_back(ParseEvent::new(EventKind::DirectiveBody, line, at));
                }
                return;
            }
            BlockState::Idle => {}
        }

        if line.trim().is_empty() {
            if has_newline {
                let end = at.shifted(line.chars().count());
                out.push_back(ParseEvent::new(EventKind::Newline, "\n", end));
            }
            return;
        }

        if let Some(fence) = parse_code_fence(line) {
            self.state = BlockState::CodeFence { len: fence.len };
            out.push_back(ParseEvent::new(EventKind::CodeBlockStart, line, at));
            return;
        }

        if is_directive_open(line) {
            self.state = BlockState::DirectiveBody;
            out.push_back(ParseEvent::new(EventKind::DirectiveOpen, line, at));
            return;
        }

        if is_horizontal_rule(line) {
            out.push_back(ParseEvent::new(EventKind::Hr, line, at));
            return;
        }

        if let Some(heading) = parse_heading(line) {
            out.push_back(ParseEvent::new(EventKind::Heading, line, at));
            self.push_inline(heading.content, at.shifted(heading.content_offset), out);
            return;
        }

        if let Some(item) = parse_list_item(line) {
            out.push_back(ParseEvent::new(EventKind::ListItem, line, at));
            self.push_inline(item.content, at.shifted(item.content_offset), out);
            return;
        }

        if let Some(quote) = parse_blockquote(line) {
            out.push_back(ParseEvent::new(EventKind::Blockquote, line, at));
            self.push_inline(quote.content, at.shifted(quote.content_offset), out);
            return;
        }

        out.push_back(ParseEvent::new(EventKind::Paragraph, line, at));
        self.push_inline(line, at, out);
    }

    fn push_inline(&self, content: &str, at: Position, out: &mut VecDeque<ParseEvent>) {
        if self.emit_inline_tokens {
            out.extend(tokenize_inline(content, at));
        } else if !content.is_empty() {
            out.push_back(ParseEvent::new(EventKind::Text, content, at));
        }
    }
}

impl Default for StreamTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, finite, single-use sequence of events from one `feed` or `flush`.
pub struct Events<'a> {
    tokenizer: &'a mut StreamTokenizer,
    rest: &'a str,
    pending: VecDeque<ParseEvent>,
    /// Run end-of-stream handling once `rest` is exhausted.
    flush: bool,
}

impl Iterator for Events<'_> {
    type Item = ParseEvent;

    fn next(&mut self) -> Option<ParseEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            if !self.rest.is_empty() {
                self.tokenizer.advance(&mut self.rest, &mut self.pending);
            } else if self.flush {
                self.flush = false;
                self.tokenizer.finish(&mut self.pending);
            } else {
                return None;
            }
        }
    }
}

impl Drop for Events<'_> {
    fn drop(&mut self) {
        let mut discarded = VecDeque::new();
        while !self.rest.is_empty() {
            self.tokenizer.advance(&mut self.rest, &mut discarded);
            discarded.clear();
        }
        if self.flush {
            self.tokenizer.finish(&mut discarded);
        }
    }
}

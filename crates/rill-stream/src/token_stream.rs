//! Event-only streaming, without tree building.

use crate::{ParseEvent, StreamTokenizer};

/// Identifies a handler registered with [`TokenStream::on_event`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Box<dyn FnMut(&ParseEvent)>;

/// Streaming tokenizer that fans every parse event out to registered
/// handlers, in registration order.
///
/// # Example
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// use rill_stream::{EventKind, TokenStream};
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = Rc::clone(&seen);
///
/// let mut stream = TokenStream::new();
/// stream.on_event(move |event| sink.borrow_mut().push(event.kind));
/// stream.push("# Hi\n");
///
/// assert_eq!(*seen.borrow(), vec![EventKind::Heading, EventKind::Text]);
/// ```
pub struct TokenStream {
    tokenizer: StreamTokenizer,
    handlers: Vec<(HandlerId, Handler)>,
    next_id: u64,
}

impl TokenStream {
    #[must_use]
    pub fn new() -> Self {
        Self::with_tokenizer(StreamTokenizer::new())
    }

    #[must_use]
    pub fn with_tokenizer(tokenizer: StreamTokenizer) -> Self {
        Self {
            tokenizer,
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn on_event(&mut self, handler: impl FnMut(&ParseEvent) + 'static) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn off(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    pub fn push(&mut self, fragment: &str) {
        for event in self.tokenizer.feed(fragment) {
            dispatch(&mut self.handlers, &event);
        }
    }

    /// Flush the tokenizer and deliver the final events.
    pub fn end(&mut self) {
        for event in self.tokenizer.flush() {
            dispatch(&mut self.handlers, &event);
        }
    }

    pub fn reset(&mut self) {
        self.tokenizer.reset();
    }
}

impl Default for TokenStream {
    fn default() -> Self {
        Self::new()
    }
}

fn dispatch(handlers: &mut [(HandlerId, Handler)], event: &ParseEvent) {
    for (_, handler) in handlers.iter_mut() {
        handler(event);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::EventKind;
    use pretty_assertions::assert_eq;

    fn recorder() -> (Rc<RefCell<Vec<EventKind>>>, impl FnMut(&ParseEvent) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |event: &ParseEvent| sink.borrow_mut().push(event.kind))
    }

    #[test]
    fn test_events_reach_every_handler() {
        let (first, h1) = recorder();
        let (second, h2) = recorder();
        let mut stream = TokenStream::new();
        stream.on_event(h1);
        stream.on_event(h2);

        stream.push("- item\n");
        assert_eq!(*first.borrow(), vec![EventKind::ListItem, EventKind::Text]);
        assert_eq!(*first.borrow(), *second.borrow());
    }

    #[test]
    fn test_off_removes_handler() {
        let (seen, handler) = recorder();
        let mut stream = TokenStream::new();
        let id = stream.on_event(handler);

        assert!(stream.off(id));
        assert!(!stream.off(id));
        stream.push("text\n");
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_end_delivers_flushed_events() {
        let (seen, handler) = recorder();
        let mut stream = TokenStream::new();
        stream.on_event(handler);

        stream.push("```\ncode");
        stream.end();
        assert_eq!(
            *seen.borrow(),
            vec![
                EventKind::CodeBlockStart,
                EventKind::CodeBlockContent,
                EventKind::CodeBlockEnd,
            ]
        );
    }
}

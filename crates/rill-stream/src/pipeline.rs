//! Streaming parse pipeline.
//!
//! Composes the [`StreamTokenizer`], [`TreeBuilder`] and
//! [`RecoveryManager`] behind `push`/`end`/`reset`, and republishes the tree
//! and its dirty nodes to subscribers whenever a call mutated the tree.
//!
//! Every call completes synchronously. A pipeline is owned by one stream
//! consumer; it is not meant to be shared across threads.

use std::sync::mpsc;

use crate::recovery::{RecoveryManager, RecoveryObserver};
use crate::tree::{Node, TreeBuilder};
use crate::{PipelineOptions, StreamTokenizer};

/// Identifies a listener registered with [`Pipeline::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// One published state: the full tree and the nodes mutated since the
/// previous publish, in tree order.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineUpdate {
    pub tree: Node,
    pub dirty: Vec<Node>,
}

/// Receiver for pipeline updates.
///
/// Wraps a [`std::sync::mpsc::Receiver`]. Dropping it unsubscribes.
pub struct UpdateReceiver {
    rx: mpsc::Receiver<PipelineUpdate>,
}

impl UpdateReceiver {
    /// Wait for the next update (blocking).
    ///
    /// Returns `None` when the pipeline is dropped.
    #[must_use]
    pub fn recv(&self) -> Option<PipelineUpdate> {
        self.rx.recv().ok()
    }

    /// Try to receive an update without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<PipelineUpdate> {
        self.rx.try_recv().ok()
    }

    /// Drain every update published so far without blocking.
    pub fn try_iter(&self) -> impl Iterator<Item = PipelineUpdate> + '_ {
        self.rx.try_iter()
    }
}

type Listener = Box<dyn FnMut(&Node, &[Node])>;

/// Incremental markdown and directive parser.
///
/// # Example
///
/// ```
/// use rill_stream::{DirectiveStatus, Pipeline};
///
/// let mut pipeline = Pipeline::new();
/// pipeline.push("::: card\ntitle: Rev");
/// pipeline.push("enue\n");
///
/// let tree = pipeline.tree();
/// let directive = tree.children()[0].as_directive().unwrap();
/// assert_eq!(directive.attributes["title"], "Revenue");
/// assert_eq!(directive.status, DirectiveStatus::Streaming);
///
/// pipeline.end();
/// let tree = pipeline.tree();
/// assert_eq!(
///     tree.children()[0].as_directive().unwrap().status,
///     DirectiveStatus::Complete
/// );
/// ```
pub struct Pipeline {
    tokenizer: StreamTokenizer,
    builder: TreeBuilder,
    listeners: Vec<(SubscriptionId, Listener)>,
    senders: Vec<mpsc::Sender<PipelineUpdate>>,
    next_subscription: u64,
    last_dirty: Vec<Node>,
    /// Incomplete UTF-8 sequence carried between `push_bytes` calls.
    pending_bytes: Vec<u8>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(PipelineOptions::default())
    }

    #[must_use]
    pub fn with_options(options: PipelineOptions) -> Self {
        Self {
            tokenizer: StreamTokenizer::with_inline_tokens(options.emit_inline_tokens),
            builder: TreeBuilder::with_recovery(RecoveryManager::new(options.recovery)),
            listeners: Vec::new(),
            senders: Vec::new(),
            next_subscription: 0,
            last_dirty: Vec::new(),
            pending_bytes: Vec::new(),
        }
    }

    /// Attach a recovery observer, replacing any previous one.
    #[must_use]
    pub fn with_recovery_observer(mut self, observer: impl RecoveryObserver + 'static) -> Self {
        self.builder.recovery_mut().set_observer(observer);
        self
    }

    pub fn recovery(&self) -> &RecoveryManager {
        self.builder.recovery()
    }

    /// Parse a text fragment.
    ///
    /// NUL characters are stripped and oversize fragments truncated before
    /// tokenizing. Publishes if the tree changed.
    pub fn push(&mut self, fragment: &str) {
        let input = self.builder.recovery().validate_input(fragment);
        if input.is_empty() {
            return;
        }

        for event in self.tokenizer.feed(&input) {
            self.builder.add_event(event);
        }
        self.publish();
    }

    /// Parse a byte fragment.
    ///
    /// A multi-byte character split across calls is reassembled. A fragment
    /// containing invalid UTF-8 is dropped (along with any carried partial
    /// character) and reported as `invalid-input`.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let mut buffer = std::mem::take(&mut self.pending_bytes);
        buffer.extend_from_slice(bytes);

        match std::str::from_utf8(&buffer) {
            Ok(text) => self.push(text),
            Err(e) if e.error_len().is_none() => {
                let (valid, tail) = buffer.split_at(e.valid_up_to());
                self.pending_bytes = tail.to_vec();
                if let Ok(text) = std::str::from_utf8(valid) {
                    self.push(text);
                }
            }
            Err(e) => {
                self.builder.recovery().report_invalid_input(format!(
                    "Dropped {}-byte fragment with invalid UTF-8 at byte {}.",
                    buffer.len(),
                    e.valid_up_to()
                ));
            }
        }
    }

    /// Signal end of stream.
    ///
    /// Flushes the tokenizer, force-closes a still-streaming directive
    /// (flagging it recovered) and publishes.
    pub fn end(&mut self) {
        if !self.pending_bytes.is_empty() {
            self.builder.recovery().report_invalid_input(format!(
                "Dropped {} trailing bytes of an incomplete character.",
                self.pending_bytes.len()
            ));
            self.pending_bytes.clear();
        }

        for event in self.tokenizer.flush() {
            self.builder.add_event(event);
        }
        self.builder.handle_stream_end();
        self.publish();
    }

    /// Start a new document and publish the empty tree.
    pub fn reset(&mut self) {
        self.tokenizer.reset();
        self.builder.reset();
        self.pending_bytes.clear();
        self.last_dirty.clear();
        self.publish();
    }

    /// Register a listener called with the tree and dirty nodes on every
    /// publish.
    pub fn subscribe(&mut self, listener: impl FnMut(&Node, &[Node]) + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Receive every future publish through a channel.
    pub fn updates(&mut self) -> UpdateReceiver {
        let (tx, rx) = mpsc::channel();
        self.senders.push(tx);
        UpdateReceiver { rx }
    }

    /// Snapshot of the current tree.
    pub fn tree(&self) -> Node {
        self.builder.tree()
    }

    /// Dirty nodes from the most recent publish.
    pub fn dirty_nodes(&self) -> &[Node] {
        &self.last_dirty
    }

    fn publish(&mut self) {
        if !self.builder.has_dirty_nodes() {
            return;
        }

        let dirty = self.builder.dirty_nodes();
        let tree = self.builder.tree();
        tracing::debug!(dirty = dirty.len(), "Publishing tree update");

        for (_, listener) in &mut self.listeners {
            listener(&tree, &dirty);
        }
        if !self.senders.is_empty() {
            self.senders.retain(|tx| {
                tx.send(PipelineUpdate {
                    tree: tree.clone(),
                    dirty: dirty.clone(),
                })
                .is_ok()
            });
        }

        self.last_dirty = dirty;
        self.builder.clear_dirty_nodes();
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

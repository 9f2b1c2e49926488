//! Incremental tree builder.
//!
//! Applies parse events to a single live document tree and records the ids
//! of every node mutated since the dirty set was last cleared.
//!
//! The builder owns the tree outright. Open constructs (the current inline
//! target, list, code block and directive) are tracked as indices into the
//! root's children, which are only ever appended to until [`reset`].
//!
//! [`reset`]: TreeBuilder::reset

use std::collections::HashSet;
use std::time::Instant;

use crate::block::{parse_code_fence, parse_heading, parse_list_item};
use crate::directive::parse_directive_header;
use crate::inline::{split_image, split_link, strip_delimiters};
use crate::recovery::{Attributes, RecoveryManager};
use crate::tree::IdGenerator;
use crate::tree::node::{
    CodeBlock, Directive, DirectiveStatus, Heading, Image, Link, List, Node, NodeKind, Parent,
    Text,
};
use crate::{EventKind, ParseEvent, Position, UnknownDirectiveMode};

/// Container receiving inline nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InlineTarget {
    /// A root-level block (paragraph, heading, blockquote).
    Block(usize),
    ListItem { list: usize, item: usize },
}

/// Where directive body lines go.
#[derive(Debug)]
enum DirectiveTarget {
    Directive(ActiveDirective),
    /// Invalid header rendered as a code block.
    CodeBlock(usize),
    /// Invalid header dropped; body lines are consumed silently.
    Ignored,
}

#[derive(Debug)]
struct ActiveDirective {
    index: usize,
    header_attributes: Attributes,
    /// Last successfully parsed body attributes (the recovery fallback).
    body_attributes: Attributes,
    opened_at: Instant,
}

/// Builds a document tree from parse events.
#[derive(Debug)]
pub struct TreeBuilder {
    root_id: String,
    children: Vec<Node>,
    ids: IdGenerator,
    dirty: HashSet<String>,
    inline_target: Option<InlineTarget>,
    active_list: Option<usize>,
    active_code_block: Option<usize>,
    active_directive: Option<DirectiveTarget>,
    recovery: RecoveryManager,
}

impl TreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::with_recovery(RecoveryManager::default())
    }

    #[must_use]
    pub fn with_recovery(recovery: RecoveryManager) -> Self {
        let mut ids = IdGenerator::new();
        let root_id = ids.next("root");
        Self {
            root_id,
            children: Vec::new(),
            ids,
            dirty: HashSet::new(),
            inline_target: None,
            active_list: None,
            active_code_block: None,
            active_directive: None,
            recovery,
        }
    }

    pub fn recovery(&self) -> &RecoveryManager {
        &self.recovery
    }

    pub fn recovery_mut(&mut self) -> &mut RecoveryManager {
        &mut self.recovery
    }

    /// Apply one parse event.
    pub fn add_event(&mut self, event: ParseEvent) {
        match event.kind {
            EventKind::Paragraph => {
                self.active_list = None;
                let index = self.push_container("paragraph", event.position, NodeKind::Paragraph);
                self.inline_target = Some(InlineTarget::Block(index));
            }
            EventKind::Heading => {
                self.active_list = None;
                let depth = parse_heading(&event.raw).map_or(1, |h| h.depth);
                let index = self.push_container("heading", event.position, |p| {
                    NodeKind::Heading(Heading {
                        depth,
                        children: p.children,
                    })
                });
                self.inline_target = Some(InlineTarget::Block(index));
            }
            EventKind::Blockquote => {
                self.active_list = None;
                let index = self.push_container("blockquote", event.position, NodeKind::Blockquote);
                self.inline_target = Some(InlineTarget::Block(index));
            }
            EventKind::ListItem => self.add_list_item(&event),
            EventKind::Text
            | EventKind::Bold
            | EventKind::Italic
            | EventKind::CodeInline
            | EventKind::Link
            | EventKind::Image => self.append_inline(event),
            EventKind::Hr => {
                self.inline_target = None;
                self.active_list = None;
                let id = self.ids.next("hr");
                self.push_block(Node::new(id, Some(event.position), NodeKind::Hr));
            }
            EventKind::Newline => {
                self.inline_target = None;
                self.active_list = None;
                let id = self.ids.next("newline");
                self.push_block(Node::new(id, Some(event.position), NodeKind::Newline));
            }
            EventKind::CodeBlockStart => {
                let language = parse_code_fence(&event.raw).and_then(|fence| fence.language);
                self.start_code_block(language, event.position);
            }
            EventKind::CodeBlockContent => {
                if self.active_code_block.is_none() {
                    self.start_code_block(None, event.position);
                }
                if let Some(index) = self.active_code_block {
                    self.append_code_line(index, &event.raw);
                }
            }
            EventKind::CodeBlockEnd => self.active_code_block = None,
            EventKind::DirectiveOpen => self.open_directive(&event),
            EventKind::DirectiveBody => self.extend_directive(&event.raw),
            EventKind::DirectiveClose => {
                if event.is_synthesized_close() {
                    self.handle_stream_end();
                } else {
                    self.close_directive();
                }
            }
        }
    }

    /// Deep copy of the whole tree.
    pub fn tree(&self) -> Node {
        Node::new(
            self.root_id.clone(),
            None,
            NodeKind::Root(Parent {
                children: self.children.clone(),
            }),
        )
    }

    /// Deep copies of the dirty nodes, in tree order.
    pub fn dirty_nodes(&self) -> Vec<Node> {
        let mut dirty = Vec::new();
        if self.dirty.is_empty() {
            return dirty;
        }
        if self.dirty.contains(&self.root_id) {
            dirty.push(self.tree());
        }
        for child in &self.children {
            child.walk(&mut |node| {
                if self.dirty.contains(&node.id) {
                    dirty.push(node.clone());
                }
            });
        }
        dirty
    }

    pub fn has_dirty_nodes(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn clear_dirty_nodes(&mut self) {
        self.dirty.clear();
    }

    /// Whether a directive is still accumulating its body.
    pub fn has_streaming_directive(&self) -> bool {
        matches!(self.active_directive, Some(DirectiveTarget::Directive(_)))
    }

    /// Force-close a still-streaming directive at end of stream.
    ///
    /// The directive becomes `complete` and is flagged as recovered.
    pub fn handle_stream_end(&mut self) {
        let Some(DirectiveTarget::Directive(active)) = self.active_directive.take() else {
            return;
        };
        let Some(node) = self.children.get_mut(active.index) else {
            return;
        };
        let Some(directive) = node.as_directive_mut() else {
            return;
        };

        if directive.finish(DirectiveStatus::Complete) {
            node.mark_recovered();
            self.dirty.insert(node.id.clone());
            self.recovery.report_unclosed_at_end(node.position);
        }
    }

    /// Discard the tree and id counter and start a fresh root.
    ///
    /// The new root is marked dirty so the empty state gets published.
    pub fn reset(&mut self) {
        self.ids.reset();
        self.root_id = self.ids.next("root");
        self.children.clear();
        self.dirty.clear();
        self.dirty.insert(self.root_id.clone());
        self.inline_target = None;
        self.active_list = None;
        self.active_code_block = None;
        self.active_directive = None;
    }

    fn push_block(&mut self, node: Node) -> usize {
        self.dirty.insert(node.id.clone());
        self.children.push(node);
        self.children.len() - 1
    }

    fn push_container(
        &mut self,
        tag: &str,
        position: Position,
        kind: impl FnOnce(Parent) -> NodeKind,
    ) -> usize {
        let id = self.ids.next(tag);
        self.push_block(Node::new(id, Some(position), kind(Parent::default())))
    }

    fn add_list_item(&mut self, event: &ParseEvent) {
        let ordered = parse_list_item(&event.raw).is_some_and(|item| item.ordered);

        let current = self.active_list.filter(|&index| {
            matches!(
                self.children.get(index).map(|node| &node.kind),
                Some(NodeKind::List(list)) if list.ordered == ordered
            )
        });
        let list_index = match current {
            Some(index) => index,
            None => {
                let id = self.ids.next("list");
                let list = NodeKind::List(List {
                    ordered,
                    children: Vec::new(),
                });
                self.push_block(Node::new(id, Some(event.position), list))
            }
        };
        self.active_list = Some(list_index);

        let item_id = self.ids.next("list-item");
        let item = Node::new(
            item_id.clone(),
            Some(event.position),
            NodeKind::ListItem(Parent::default()),
        );
        let Some(list) = self.children.get_mut(list_index) else {
            return;
        };
        let Some(items) = list.children_mut() else {
            return;
        };
        items.push(item);
        let item_index = items.len() - 1;

        self.dirty.insert(list.id.clone());
        self.dirty.insert(item_id);
        self.inline_target = Some(InlineTarget::ListItem {
            list: list_index,
            item: item_index,
        });
    }

    fn append_inline(&mut self, event: ParseEvent) {
        let target = match self.inline_target {
            Some(target) => target,
            None => {
                let index = self.push_container("paragraph", event.position, NodeKind::Paragraph);
                let target = InlineTarget::Block(index);
                self.inline_target = Some(target);
                target
            }
        };

        let node = self.inline_node(event);
        let node_id = node.id.clone();

        let container = match target {
            InlineTarget::Block(index) => self.children.get_mut(index),
            InlineTarget::ListItem { list, item } => self
                .children
                .get_mut(list)
                .and_then(Node::children_mut)
                .and_then(|items| items.get_mut(item)),
        };
        let Some(container) = container else {
            return;
        };
        let container_id = container.id.clone();
        let Some(children) = container.children_mut() else {
            return;
        };
        children.push(node);

        self.dirty.insert(container_id);
        self.dirty.insert(node_id);
    }

    fn inline_node(&mut self, event: ParseEvent) -> Node {
        let position = Some(event.position);
        let tag = match event.kind {
            EventKind::Bold => "bold",
            EventKind::Italic => "italic",
            EventKind::CodeInline => "code-inline",
            EventKind::Link => "link",
            EventKind::Image => "image",
            _ => "text",
        };
        let id = self.ids.next(tag);
        let text_child = |value: &str| {
            Node::new(
                format!("{id}-text"),
                position,
                NodeKind::Text(Text {
                    value: value.to_owned(),
                }),
            )
        };

        let kind = match event.kind {
            EventKind::Bold | EventKind::Italic | EventKind::CodeInline => {
                let inner = strip_delimiters(event.kind, &event.raw);
                let children = vec![text_child(inner)];
                match event.kind {
                    EventKind::Bold => NodeKind::Bold(Parent { children }),
                    EventKind::Italic => NodeKind::Italic(Parent { children }),
                    _ => NodeKind::CodeInline(Parent { children }),
                }
            }
            EventKind::Link => {
                let (label, url) = split_link(&event.raw).unwrap_or((event.raw.as_str(), ""));
                NodeKind::Link(Link {
                    url: url.to_owned(),
                    children: vec![text_child(label)],
                })
            }
            EventKind::Image => {
                let (alt, src) = split_image(&event.raw).unwrap_or(("", ""));
                NodeKind::Image(Image {
                    src: src.to_owned(),
                    alt: (!alt.is_empty()).then(|| alt.to_owned()),
                })
            }
            _ => NodeKind::Text(Text { value: event.raw }),
        };

        Node::new(id, position, kind)
    }

    fn start_code_block(&mut self, language: Option<String>, position: Position) {
        self.inline_target = None;
        self.active_list = None;
        let id = self.ids.next("code-block");
        let node = Node::new(
            id,
            Some(position),
            NodeKind::CodeBlock(CodeBlock {
                language,
                code: String::new(),
            }),
        );
        self.active_code_block = Some(self.push_block(node));
    }

    fn append_code_line(&mut self, index: usize, line: &str) {
        let Some(node) = self.children.get_mut(index) else {
            return;
        };
        let NodeKind::CodeBlock(block) = &mut node.kind else {
            return;
        };
        if !block.code.is_empty() {
            block.code.push('\n');
        }
        block.code.push_str(line);
        self.dirty.insert(node.id.clone());
    }

    fn open_directive(&mut self, event: &ParseEvent) {
        self.inline_target = None;
        self.active_list = None;

        let (name, header_attributes, recovered) = match parse_directive_header(&event.raw) {
            Some(header) => {
                let attributes = header.inline_attributes.map_or_else(Attributes::new, |attrs| {
                    self.recovery.recover_body(
                        &format!("{{{attrs}}}"),
                        &Attributes::new(),
                        Some(event.position),
                    )
                });
                (header.name, attributes, false)
            }
            None => {
                self.recovery.report_invalid_directive(event.position);
                let mode = self.recovery.config().unknown_directive;
                match mode {
                    UnknownDirectiveMode::FallbackText => {
                        ("unknown".to_owned(), Attributes::new(), true)
                    }
                    UnknownDirectiveMode::FallbackCodeBlock => {
                        let id = self.ids.next("code-block");
                        let mut node = Node::new(
                            id,
                            Some(event.position),
                            NodeKind::CodeBlock(CodeBlock {
                                language: None,
                                code: event.raw.clone(),
                            }),
                        );
                        node.mark_recovered();
                        let index = self.push_block(node);
                        self.active_directive = Some(DirectiveTarget::CodeBlock(index));
                        return;
                    }
                    UnknownDirectiveMode::Ignore => {
                        self.active_directive = Some(DirectiveTarget::Ignored);
                        return;
                    }
                }
            }
        };

        let id = self.ids.next("directive");
        let mut node = Node::new(
            id,
            Some(event.position),
            NodeKind::Directive(Directive {
                name,
                attributes: header_attributes.clone(),
                raw_body: String::new(),
                status: DirectiveStatus::Streaming,
            }),
        );
        if recovered {
            node.mark_recovered();
        }
        let index = self.push_block(node);

        self.active_directive = Some(DirectiveTarget::Directive(ActiveDirective {
            index,
            header_attributes,
            body_attributes: Attributes::new(),
            opened_at: Instant::now(),
        }));
    }

    /// Append a body line and re-derive the attributes.
    ///
    /// The timeout is checked after the line is applied; a directive that
    /// times out is detached and later body or close events are inert.
    fn extend_directive(&mut self, line: &str) {
        if let Some(DirectiveTarget::CodeBlock(index)) = self.active_directive {
            self.append_code_line(index, line);
            return;
        }
        let Some(DirectiveTarget::Directive(active)) = &mut self.active_directive else {
            return;
        };

        let Some(node) = self.children.get_mut(active.index) else {
            return;
        };
        let position = node.position;
        let NodeKind::Directive(directive) = &mut node.kind else {
            return;
        };

        if !directive.raw_body.is_empty() {
            directive.raw_body.push('\n');
        }
        directive.raw_body.push_str(line);

        active.body_attributes =
            self.recovery
                .recover_body(&directive.raw_body, &active.body_attributes, position);

        let mut attributes = active.header_attributes.clone();
        attributes.extend(active.body_attributes.clone());
        directive.attributes = attributes;

        let timed_out = self
            .recovery
            .check_directive_timeout(active.opened_at.elapsed(), position);
        if timed_out {
            directive.finish(DirectiveStatus::Error);
            node.mark_recovered();
        }
        self.dirty.insert(node.id.clone());

        if timed_out {
            self.active_directive = None;
        }
    }

    fn close_directive(&mut self) {
        let Some(DirectiveTarget::Directive(active)) = self.active_directive.take() else {
            return;
        };
        let Some(node) = self.children.get_mut(active.index) else {
            return;
        };
        if node
            .as_directive_mut()
            .is_some_and(|directive| directive.finish(DirectiveStatus::Complete))
        {
            self.dirty.insert(node.id.clone());
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

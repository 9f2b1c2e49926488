//! Document tree nodes.
//!
//! A node is an id, an optional source position, optional recovery metadata
//! and a [`NodeKind`]. Container kinds implement [`Container`]; leaves do not.

use serde::Serialize;

use crate::Position;
use crate::recovery::Attributes;

/// Growable child list, implemented by exactly the container node kinds.
pub trait Container {
    fn children(&self) -> &[Node];
    fn children_mut(&mut self) -> &mut Vec<Node>;
}

/// Marks a node whose state came from a fallback policy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NodeMeta {
    pub recovered: bool,
}

/// A document tree node.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<NodeMeta>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Node variants, serialized with a kebab-case `type` tag.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Root(Parent),
    Paragraph(Parent),
    Heading(Heading),
    Text(Text),
    Bold(Parent),
    Italic(Parent),
    CodeInline(Parent),
    CodeBlock(CodeBlock),
    List(List),
    ListItem(Parent),
    Blockquote(Parent),
    Link(Link),
    Image(Image),
    Hr,
    Newline,
    Directive(Directive),
}

/// Children of a container without further fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Parent {
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Heading {
    /// 1 to 6.
    pub depth: u8,
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Text {
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CodeBlock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Content lines joined with `\n`.
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct List {
    pub ordered: bool,
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Link {
    pub url: String,
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Image {
    pub src: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Lifecycle of a directive node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveStatus {
    /// Open; body still arriving.
    Streaming,
    Complete,
    /// Timed out while streaming.
    Error,
}

/// A `::: name` block and its parsed body.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    pub name: String,
    pub attributes: Attributes,
    /// Body lines joined with `\n`, verbatim.
    pub raw_body: String,
    pub status: DirectiveStatus,
}

impl Directive {
    /// Leave the `streaming` state.
    ///
    /// Returns `false` (and changes nothing) if the directive already left
    /// it, so a status never regresses or flips between terminal states.
    pub fn finish(&mut self, status: DirectiveStatus) -> bool {
        if self.status != DirectiveStatus::Streaming || status == DirectiveStatus::Streaming {
            return false;
        }
        self.status = status;
        true
    }
}

macro_rules! impl_container {
    ($($ty:ty),+) => {
        $(impl Container for $ty {
            fn children(&self) -> &[Node] {
                &self.children
            }

            fn children_mut(&mut self) -> &mut Vec<Node> {
                &mut self.children
            }
        })+
    };
}

impl_container!(Parent, Heading, List, Link);

impl NodeKind {
    /// Kebab-case tag, matching the serialized `type` field.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Root(_) => "root",
            Self::Paragraph(_) => "paragraph",
            Self::Heading(_) => "heading",
            Self::Text(_) => "text",
            Self::Bold(_) => "bold",
            Self::Italic(_) => "italic",
            Self::CodeInline(_) => "code-inline",
            Self::CodeBlock(_) => "code-block",
            Self::List(_) => "list",
            Self::ListItem(_) => "list-item",
            Self::Blockquote(_) => "blockquote",
            Self::Link(_) => "link",
            Self::Image(_) => "image",
            Self::Hr => "hr",
            Self::Newline => "newline",
            Self::Directive(_) => "directive",
        }
    }

    pub fn as_container(&self) -> Option<&dyn Container> {
        match self {
            Self::Root(p)
            | Self::Paragraph(p)
            | Self::Bold(p)
            | Self::Italic(p)
            | Self::CodeInline(p)
            | Self::ListItem(p)
            | Self::Blockquote(p) => Some(p),
            Self::Heading(h) => Some(h),
            Self::List(l) => Some(l),
            Self::Link(l) => Some(l),
            Self::Text(_)
            | Self::CodeBlock(_)
            | Self::Image(_)
            | Self::Hr
            | Self::Newline
            | Self::Directive(_) => None,
        }
    }

    pub fn as_container_mut(&mut self) -> Option<&mut dyn Container> {
        match self {
            Self::Root(p)
            | Self::Paragraph(p)
            | Self::Bold(p)
            | Self::Italic(p)
            | Self::CodeInline(p)
            | Self::ListItem(p)
            | Self::Blockquote(p) => Some(p),
            Self::Heading(h) => Some(h),
            Self::List(l) => Some(l),
            Self::Link(l) => Some(l),
            Self::Text(_)
            | Self::CodeBlock(_)
            | Self::Image(_)
            | Self::Hr
            | Self::Newline
            | Self::Directive(_) => None,
        }
    }
}

impl Node {
    pub fn new(id: String, position: Option<Position>, kind: NodeKind) -> Self {
        Self {
            id,
            position,
            meta: None,
            kind,
        }
    }

    /// Children of a container node; empty for leaves.
    pub fn children(&self) -> &[Node] {
        match self.kind.as_container() {
            Some(container) => container.children(),
            None => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        self.kind
            .as_container_mut()
            .map(|container| container.children_mut())
    }

    pub fn is_recovered(&self) -> bool {
        self.meta.is_some_and(|meta| meta.recovered)
    }

    pub fn mark_recovered(&mut self) {
        self.meta = Some(NodeMeta { recovered: true });
    }

    pub fn as_directive(&self) -> Option<&Directive> {
        match &self.kind {
            NodeKind::Directive(directive) => Some(directive),
            _ => None,
        }
    }

    pub fn as_directive_mut(&mut self) -> Option<&mut Directive> {
        match &mut self.kind {
            NodeKind::Directive(directive) => Some(directive),
            _ => None,
        }
    }

    /// Visit this node and its descendants in tree (pre-)order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |node| {
            if let NodeKind::Text(text) = &node.kind {
                out.push_str(&text.value);
            }
        });
        out
    }

    /// Every directive in the subtree, in tree order.
    pub fn directives(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        self.walk(&mut |node| {
            if node.as_directive().is_some() {
                out.push(node);
            }
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn text(id: &str, value: &str) -> Node {
        Node::new(
            id.to_owned(),
            None,
            NodeKind::Text(Text {
                value: value.to_owned(),
            }),
        )
    }

    fn streaming_directive() -> Directive {
        Directive {
            name: "card".to_owned(),
            attributes: Attributes::new(),
            raw_body: String::new(),
            status: DirectiveStatus::Streaming,
        }
    }

    #[test]
    fn test_directive_status_transitions() {
        let mut directive = streaming_directive();
        assert!(directive.finish(DirectiveStatus::Complete));
        assert!(!directive.finish(DirectiveStatus::Error));
        assert!(!directive.finish(DirectiveStatus::Streaming));
        assert_eq!(directive.status, DirectiveStatus::Complete);
    }

    #[test]
    fn test_finish_to_streaming_is_rejected() {
        let mut directive = streaming_directive();
        assert!(!directive.finish(DirectiveStatus::Streaming));
        assert!(directive.finish(DirectiveStatus::Error));
        assert_eq!(directive.status, DirectiveStatus::Error);
    }

    #[test]
    fn test_leaves_have_no_children() {
        let leaf = text("text-1", "hi");
        assert!(leaf.children().is_empty());
        assert!(leaf.kind.as_container().is_none());

        let mut hr = Node::new("hr-2".to_owned(), None, NodeKind::Hr);
        assert!(hr.children_mut().is_none());
    }

    #[test]
    fn test_walk_is_preorder() {
        let mut paragraph = Node::new(
            "paragraph-2".to_owned(),
            None,
            NodeKind::Paragraph(Parent::default()),
        );
        paragraph
            .children_mut()
            .unwrap()
            .extend([text("text-3", "a"), text("text-4", "b")]);
        let root = Node::new(
            "root-1".to_owned(),
            None,
            NodeKind::Root(Parent {
                children: vec![paragraph],
            }),
        );

        let mut ids = Vec::new();
        root.walk(&mut |node| ids.push(node.id.as_str()));
        assert_eq!(ids, vec!["root-1", "paragraph-2", "text-3", "text-4"]);
        assert_eq!(root.text_content(), "ab");
    }

    #[test]
    fn test_serialization_shape() {
        let mut node = Node::new(
            "directive-2".to_owned(),
            Some(Position::START),
            NodeKind::Directive(streaming_directive()),
        );
        node.mark_recovered();

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            json!({
                "id": "directive-2",
                "position": {"line": 1, "column": 1, "offset": 0},
                "meta": {"recovered": true},
                "type": "directive",
                "name": "card",
                "attributes": {},
                "rawBody": "",
                "status": "streaming",
            })
        );
    }

    #[test]
    fn test_tag_matches_serialized_type() {
        let node = Node::new(
            "code-block-1".to_owned(),
            None,
            NodeKind::CodeBlock(CodeBlock {
                language: Some("rust".to_owned()),
                code: String::new(),
            }),
        );
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], node.kind.tag());
    }
}

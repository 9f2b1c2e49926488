//! Document tree: node model, deterministic ids and the incremental builder.

mod builder;
mod id;
mod node;

pub use builder::TreeBuilder;
pub use id::IdGenerator;
pub use node::{
    CodeBlock, Container, Directive, DirectiveStatus, Heading, Image, Link, List, Node, NodeKind,
    NodeMeta, Parent, Text,
};

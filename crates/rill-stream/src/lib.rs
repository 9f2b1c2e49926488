//! Incremental parser for streamed markdown with `:::` directive blocks.
//!
//! Text arrives in fragments of any size (down to a single character or a
//! single byte) and is turned into a live document tree that can be rendered
//! at any point, including mid-line.
//!
//! # Architecture
//!
//! Data flows one way:
//!
//! - [`StreamTokenizer`]: buffers partial lines and classifies each completed
//!   line into [`ParseEvent`]s, running the inline span tokenizer over block
//!   content
//! - [`TreeBuilder`]: applies events to the document tree with deterministic
//!   ids and dirty-node tracking
//! - [`RecoveryManager`]: sanitizes input and substitutes safe fallbacks for
//!   malformed directives, reporting each decision to an optional observer
//! - [`Pipeline`]: composes the above behind `push`/`end`/`reset` and
//!   publishes the tree and dirty nodes to subscribers
//!
//! Nothing in the pipeline is fatal. A caller that ignores recovery events
//! still gets a usable tree; degraded nodes carry `meta.recovered`.
//!
//! # Example
//!
//! ```
//! use rill_stream::{NodeKind, Pipeline};
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.subscribe(|tree, dirty| {
//!     println!("{} nodes changed under {}", dirty.len(), tree.id);
//! });
//!
//! for fragment in ["# Stat", "us\n::: card\nti", "tle: Ready\n:::\n"] {
//!     pipeline.push(fragment);
//! }
//! pipeline.end();
//!
//! let tree = pipeline.tree();
//! assert!(matches!(tree.children()[0].kind, NodeKind::Heading(_)));
//! assert_eq!(tree.directives()[0].as_directive().unwrap().attributes["title"], "Ready");
//! ```

pub mod block;
pub mod directive;
mod event;
pub mod inline;
mod options;
mod pipeline;
mod position;
pub mod recovery;
mod token_stream;
mod tokenizer;
pub mod tree;

pub use event::{EventKind, ParseEvent};
pub use options::{
    DEFAULT_BODY_CACHE_CAPACITY, DEFAULT_DIRECTIVE_TIMEOUT, DEFAULT_MAX_FRAGMENT_BYTES,
    PipelineOptions, RecoveryConfig, UnknownDirectiveMode,
};
pub use pipeline::{Pipeline, PipelineUpdate, SubscriptionId, UpdateReceiver};
pub use position::Position;
pub use recovery::{
    Attributes, BodyParseError, RecoveryEvent, RecoveryKind, RecoveryManager, RecoveryObserver,
};
pub use token_stream::{HandlerId, TokenStream};
pub use tokenizer::{Events, StreamTokenizer};
pub use tree::{Container, DirectiveStatus, Node, NodeKind, NodeMeta, TreeBuilder};

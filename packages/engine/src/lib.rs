//! # p2pp engine
//!
//! Keeps a source text and a model object graph in sync across edits:
//! re-serializing an edited model reproduces the original text byte for
//! byte wherever nothing changed and patches only what did.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ language binding: text → AST → model        │
//! │  - FragmentRetriever (AST → source span)    │
//! │  - make_object_node (object → contents)     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ P2ppTree: arena of nodes, one per object    │
//! │  - initialize_pretty_print: find delimiters │
//! │  - render: incremental text per node        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ p2pp-rawsource: DerivedRawSource edits      │
//! │  folded over the original text              │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Original text wins**: unchanged parts are copied, never re-printed
//! 2. **Delimiters are discovered**: commas and brackets outside AST spans
//!    are searched for once and reused afterwards
//! 3. **Normalized only when new**: text rendered from the model is used
//!    only where no original text exists
//! 4. **Contained failures**: an object without a node renders empty, the
//!    rest of the document still renders
//!
//! ## Usage
//!
//! ```rust,ignore
//! use p2pp_engine::P2ppTree;
//!
//! let mut tree = P2ppTree::deserialize(binding, &text, &root_ast)?;
//!
//! // Edit the model through the handles the binding handed out
//! list.borrow_mut().items.remove(1);
//!
//! let updated = tree.render()?;
//! ```

mod binding;
mod config;
mod contents;
mod context;
mod discovery;
mod error;
mod node;
mod render;
mod tree;

pub use binding::{FragmentRetriever, LanguageBinding, ModelRef, NodeLayout};
pub use config::PrettyPrintConfig;
pub use contents::{
    ChildContents, ChildrenContents, ConditionalContents, Contents, ContentsKind, Delimiter,
    DynamicContents, LiteralState, SequentialContents, StaticContents,
};
pub use context::{Indentation, PrettyPrintContext};
pub use error::{P2ppError, P2ppResult};
pub use node::{FragmentRole, MappedFragment, NodeId, P2ppNode};
pub use tree::{NodeSnapshot, P2ppTree, TreeSnapshot};

pub use p2pp_rawsource as rawsource;

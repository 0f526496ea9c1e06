use p2pp_rawsource::{RawSourceFragment, RawSourcePosition};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::contents::{Contents, Delimiter};

/// Index of a node in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a registered fragment stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FragmentRole {
    /// Original text of a static or dynamic literal
    Literal,
    Prelude,
    Postlude,
}

/// A fragment discovered during initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedFragment {
    /// Node whose contents discovered the fragment
    pub owner: NodeId,
    pub role: FragmentRole,
    pub fragment: RawSourceFragment,
}

/// Bridge between one model object and the source text it was parsed from
///
/// Nodes live in the arena of a [`crate::P2ppTree`]; links are [`NodeId`]s.
pub struct P2ppNode<A, O> {
    pub(crate) object: O,
    pub(crate) ast: Option<A>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) child_index: HashMap<O, NodeId>,
    /// Fragment reported by the fragment retriever
    pub(crate) parsed_fragment: Option<RawSourceFragment>,
    /// Parsed fragment grown by everything discovered around it
    pub(crate) span: Option<RawSourceFragment>,
    /// Item delimiters discovered by the parent's contents
    pub(crate) prelude: Delimiter,
    pub(crate) postlude: Delimiter,
    pub(crate) contents: Vec<Contents<O>>,
    pub(crate) default_insertion_point: Option<RawSourcePosition>,
    /// Set once delimiter discovery has run over this node
    pub(crate) discovered: bool,
}

impl<A, O: Eq + Hash> P2ppNode<A, O> {
    pub(crate) fn new(
        object: O,
        ast: Option<A>,
        parent: Option<NodeId>,
        parsed_fragment: Option<RawSourceFragment>,
        contents: Vec<Contents<O>>,
    ) -> Self {
        Self {
            object,
            ast,
            parent,
            children: Vec::new(),
            child_index: HashMap::new(),
            parsed_fragment,
            span: parsed_fragment,
            prelude: Delimiter::Absent,
            postlude: Delimiter::Absent,
            contents,
            default_insertion_point: parsed_fragment.map(|fragment| fragment.start()),
            discovered: false,
        }
    }

    pub fn object(&self) -> &O {
        &self.object
    }

    pub fn ast(&self) -> Option<&A> {
        self.ast.as_ref()
    }

    /// Nodes without an AST counterpart always render from the model
    pub fn is_synthetic(&self) -> bool {
        self.ast.is_none()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child_for(&self, object: &O) -> Option<NodeId> {
        self.child_index.get(object).copied()
    }

    pub fn parsed_fragment(&self) -> Option<RawSourceFragment> {
        self.parsed_fragment
    }

    /// Text this node owned at the last parse, delimiters found by its own
    /// contents included
    pub fn last_parsed_fragment(&self) -> Option<RawSourceFragment> {
        self.span
    }

    pub fn start(&self) -> Option<RawSourcePosition> {
        self.span.map(|span| span.start())
    }

    pub fn end(&self) -> Option<RawSourcePosition> {
        self.span.map(|span| span.end())
    }

    pub fn prelude(&self) -> &Delimiter {
        &self.prelude
    }

    pub fn postlude(&self) -> &Delimiter {
        &self.postlude
    }

    /// Span together with the item delimiters discovered around it
    pub fn covering_fragment(&self) -> Option<RawSourceFragment> {
        let covering = RawSourceFragment::merge(self.span, self.prelude.fragment());
        RawSourceFragment::merge(covering, self.postlude.fragment())
    }

    pub fn contents(&self) -> &[Contents<O>] {
        &self.contents
    }

    pub fn default_insertion_point(&self) -> Option<RawSourcePosition> {
        self.default_insertion_point
    }

    /// Whether renders reuse this node's original text
    pub(crate) fn renders_incrementally(&self) -> bool {
        self.ast.is_some() && self.span.is_some() && self.discovered
    }

    /// Grow the span to cover `fragment`. Spans never shrink.
    pub(crate) fn extend(&mut self, fragment: RawSourceFragment) -> bool {
        match self.span {
            Some(span) if span.contains(&fragment) => false,
            Some(span) => {
                self.span = Some(span.union(&fragment));
                true
            }
            None => false,
        }
    }
}

impl<A, O: fmt::Debug> fmt::Debug for P2ppNode<A, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("P2ppNode")
            .field("object", &self.object)
            .field("synthetic", &self.ast.is_none())
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("span", &self.span)
            .field("prelude", &self.prelude)
            .field("postlude", &self.postlude)
            .field("contents", &self.contents)
            .finish()
    }
}

//! # Pretty-printable contents
//!
//! A node's serialization is an ordered list of [`Contents`]. Each one
//! describes one sub-part of the text and keeps the fragment bookkeeping
//! needed to update that part in place on later renders.
//!
//! The variants form a closed set ([`ContentsKind`]); initialization,
//! incremental update and normalized rendering all match on it.

use p2pp_rawsource::RawSourceFragment;
use serde::Serialize;
use std::fmt;

use crate::context::Indentation;
use crate::error::{P2ppError, P2ppResult};
use crate::NodeId;

/// Delimiter state for a prelude or postlude literal
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum Delimiter {
    /// No literal expected
    #[default]
    Absent,
    /// Literal matched in the original text. The fragment also covers the
    /// whitespace between the match and the boundary it was searched from.
    Found {
        literal: String,
        fragment: RawSourceFragment,
    },
    /// Literal expected but not reusable from the original text; it is
    /// emitted as inserted text instead.
    Unresolved { literal: String },
}

impl Delimiter {
    pub fn fragment(&self) -> Option<RawSourceFragment> {
        match self {
            Delimiter::Found { fragment, .. } => Some(*fragment),
            _ => None,
        }
    }

    pub fn literal(&self) -> &str {
        match self {
            Delimiter::Absent => "",
            Delimiter::Found { literal, .. } | Delimiter::Unresolved { literal } => literal,
        }
    }

    /// Text that has to be emitted because no original bytes back it
    pub fn pending(&self) -> &str {
        match self {
            Delimiter::Unresolved { literal } => literal,
            _ => "",
        }
    }
}

/// Fragment bookkeeping shared by static and dynamic literals
#[derive(Debug, Clone, Default)]
pub struct LiteralState {
    /// Where the literal sits in the original text
    pub(crate) literal: Option<RawSourceFragment>,
    pub(crate) prelude: Delimiter,
    pub(crate) postlude: Delimiter,
}

impl LiteralState {
    pub fn literal_fragment(&self) -> Option<RawSourceFragment> {
        self.literal
    }

    pub fn prelude(&self) -> &Delimiter {
        &self.prelude
    }

    pub fn postlude(&self) -> &Delimiter {
        &self.postlude
    }
}

pub struct StaticContents {
    pub(crate) text: String,
    pub(crate) state: LiteralState,
}

pub struct DynamicContents {
    pub(crate) supplier: Box<dyn Fn() -> String>,
    pub(crate) state: LiteralState,
}

pub struct ChildContents<O> {
    pub(crate) supplier: Box<dyn Fn() -> Option<O>>,
    /// Child node that owned original text at initialization
    pub(crate) parsed_child: Option<NodeId>,
}

/// One entry of the list as it was parsed
#[derive(Debug, Clone)]
pub(crate) struct ParsedItem<O> {
    pub(crate) object: O,
    pub(crate) node: NodeId,
    /// Effective delimiter literals the item had in the original list
    pub(crate) prelude: String,
    pub(crate) postlude: String,
}

pub struct ChildrenContents<O> {
    pub(crate) supplier: Box<dyn Fn() -> Vec<O>>,
    pub(crate) first_prelude: Option<String>,
    pub(crate) last_postlude: Option<String>,
    pub(crate) last_parsed: Vec<ParsedItem<O>>,
    /// Later occurrences of objects already in `last_parsed`. Their original
    /// text has no node of its own and is left as it is.
    pub(crate) repeated: Vec<O>,
}

impl<O> ChildrenContents<O> {
    /// Effective delimiters of item `index` in a list of `count`, given the
    /// contents-level item prelude and postlude
    pub(crate) fn item_delimiters(
        &self,
        prelude: &str,
        postlude: &str,
        index: usize,
        count: usize,
    ) -> (String, String) {
        let prelude = match &self.first_prelude {
            Some(first) if index == 0 => first.clone(),
            _ => prelude.to_string(),
        };
        let postlude = match &self.last_postlude {
            Some(last) if index + 1 == count => last.clone(),
            _ => postlude.to_string(),
        };
        (prelude, postlude)
    }
}

pub struct ConditionalContents<O> {
    pub(crate) predicate: Box<dyn Fn() -> bool>,
    pub(crate) then_contents: Option<Box<Contents<O>>>,
    pub(crate) else_contents: Option<Box<Contents<O>>>,
    /// Branch whose text exists in the original source
    pub(crate) parsed_branch: Option<bool>,
}

impl<O> ConditionalContents<O> {
    pub(crate) fn branch(&self, taken: bool) -> Option<&Contents<O>> {
        if taken {
            self.then_contents.as_deref()
        } else {
            self.else_contents.as_deref()
        }
    }

    pub(crate) fn branch_mut(&mut self, taken: bool) -> Option<&mut Contents<O>> {
        if taken {
            self.then_contents.as_deref_mut()
        } else {
            self.else_contents.as_deref_mut()
        }
    }
}

pub struct SequentialContents<O> {
    pub(crate) members: Vec<Contents<O>>,
    pub(crate) covering_stale: bool,
}

pub enum ContentsKind<O> {
    Static(StaticContents),
    Dynamic(DynamicContents),
    Child(ChildContents<O>),
    Children(ChildrenContents<O>),
    Conditional(ConditionalContents<O>),
    Sequential(SequentialContents<O>),
}

impl<O> ContentsKind<O> {
    pub fn name(&self) -> &'static str {
        match self {
            ContentsKind::Static(_) => "static",
            ContentsKind::Dynamic(_) => "dynamic",
            ContentsKind::Child(_) => "child",
            ContentsKind::Children(_) => "children",
            ContentsKind::Conditional(_) => "conditional",
            ContentsKind::Sequential(_) => "sequential",
        }
    }
}

/// One sub-part of a node's serialization
pub struct Contents<O> {
    pub(crate) prelude: Option<String>,
    pub(crate) postlude: Option<String>,
    pub(crate) indentation: Indentation,
    /// Original text covered by this contents, including discovered
    /// delimiters. Assigned during initialization.
    pub(crate) fragment: Option<RawSourceFragment>,
    pub(crate) kind: ContentsKind<O>,
}

impl<O: 'static> Contents<O> {
    fn from_kind(kind: ContentsKind<O>) -> Self {
        Self {
            prelude: None,
            postlude: None,
            indentation: Indentation::Keep,
            fragment: None,
            kind,
        }
    }

    /// Fixed literal text
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::from_kind(ContentsKind::Static(StaticContents {
            text: text.into(),
            state: LiteralState::default(),
        }))
    }

    /// Literal recomputed from the model on every render
    pub fn dynamic(supplier: impl Fn() -> String + 'static) -> Self {
        Self::from_kind(ContentsKind::Dynamic(DynamicContents {
            supplier: Box::new(supplier),
            state: LiteralState::default(),
        }))
    }

    /// A single sub-object, possibly absent
    pub fn child(supplier: impl Fn() -> Option<O> + 'static) -> Self {
        Self::from_kind(ContentsKind::Child(ChildContents {
            supplier: Box::new(supplier),
            parsed_child: None,
        }))
    }

    /// An ordered collection of sub-objects. The contents' prelude and
    /// postlude apply to every item.
    pub fn children(supplier: impl Fn() -> Vec<O> + 'static) -> Self {
        Self::from_kind(ContentsKind::Children(ChildrenContents {
            supplier: Box::new(supplier),
            first_prelude: None,
            last_postlude: None,
            last_parsed: Vec::new(),
            repeated: Vec::new(),
        }))
    }

    pub fn conditional(
        predicate: impl Fn() -> bool + 'static,
        then_contents: Contents<O>,
        else_contents: Option<Contents<O>>,
    ) -> Self {
        Self::from_kind(ContentsKind::Conditional(ConditionalContents {
            predicate: Box::new(predicate),
            then_contents: Some(Box::new(then_contents)),
            else_contents: else_contents.map(Box::new),
            parsed_branch: None,
        }))
    }

    pub fn sequence(members: Vec<Contents<O>>) -> Self {
        Self::from_kind(ContentsKind::Sequential(SequentialContents {
            members,
            covering_stale: true,
        }))
    }

    pub fn with_prelude(mut self, prelude: impl Into<String>) -> Self {
        self.prelude = Some(prelude.into());
        self
    }

    pub fn with_postlude(mut self, postlude: impl Into<String>) -> Self {
        self.postlude = Some(postlude.into());
        self
    }

    pub fn indented(mut self, indentation: Indentation) -> Self {
        self.indentation = indentation;
        self
    }

    /// Pin a static or dynamic literal to the fragment its AST token was
    /// parsed from. Without it the literal is searched for in the node's
    /// text during initialization.
    pub fn at(mut self, fragment: RawSourceFragment) -> Self {
        match &mut self.kind {
            ContentsKind::Static(StaticContents { state, .. })
            | ContentsKind::Dynamic(DynamicContents { state, .. }) => {
                state.literal = Some(fragment);
            }
            other => {
                tracing::debug!(
                    kind = other.name(),
                    "ignoring fragment pinned to non-literal contents"
                );
            }
        }
        self
    }

    /// Distinct prelude for the first item of a children list
    pub fn with_first_prelude(mut self, prelude: impl Into<String>) -> Self {
        if let ContentsKind::Children(children) = &mut self.kind {
            children.first_prelude = Some(prelude.into());
        }
        self
    }

    /// Distinct postlude for the last item of a children list
    pub fn with_last_postlude(mut self, postlude: impl Into<String>) -> Self {
        if let ContentsKind::Children(children) = &mut self.kind {
            children.last_postlude = Some(postlude.into());
        }
        self
    }

    /// Items joined by `separator`: every item but the first is preceded by it
    pub fn separated_by(self, separator: impl Into<String>) -> Self {
        self.with_prelude(separator).with_first_prelude("")
    }

    /// Add a member to a sequential contents. The new member has no original
    /// text, so it is inserted at the running insertion point.
    pub fn append(&mut self, member: Contents<O>) -> P2ppResult<()> {
        match &mut self.kind {
            ContentsKind::Sequential(sequence) => {
                sequence.members.push(member);
                sequence.covering_stale = true;
                Ok(())
            }
            _ => Err(P2ppError::NotSequential),
        }
    }
}

impl<O> Contents<O> {
    pub fn kind(&self) -> &ContentsKind<O> {
        &self.kind
    }

    pub fn indentation(&self) -> Indentation {
        self.indentation
    }

    pub fn prelude(&self) -> &str {
        self.prelude.as_deref().unwrap_or("")
    }

    pub fn postlude(&self) -> &str {
        self.postlude.as_deref().unwrap_or("")
    }

    /// Original text this contents covers, if any.
    ///
    /// For sequential contents the union of the members is cached and
    /// recomputed after an append.
    pub fn covering_fragment(&mut self) -> Option<RawSourceFragment> {
        if let ContentsKind::Sequential(sequence) = &mut self.kind {
            if sequence.covering_stale {
                self.fragment = sequence
                    .members
                    .iter_mut()
                    .fold(None, |acc, member| {
                        RawSourceFragment::merge(acc, member.covering_fragment())
                    });
                sequence.covering_stale = false;
            }
        }
        self.fragment
    }

    /// Effective delimiters of item `index` in a list of `count`
    pub(crate) fn item_delimiters(&self, index: usize, count: usize) -> (String, String) {
        match &self.kind {
            ContentsKind::Children(children) => {
                children.item_delimiters(self.prelude(), self.postlude(), index, count)
            }
            _ => (self.prelude().to_string(), self.postlude().to_string()),
        }
    }
}

impl<O> fmt::Debug for Contents<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Contents");
        debug
            .field("kind", &self.kind.name())
            .field("prelude", &self.prelude)
            .field("postlude", &self.postlude)
            .field("indentation", &self.indentation)
            .field("fragment", &self.fragment);

        match &self.kind {
            ContentsKind::Static(fixed) => {
                debug.field("text", &fixed.text).field("state", &fixed.state);
            }
            ContentsKind::Dynamic(dynamic) => {
                debug.field("state", &dynamic.state);
            }
            ContentsKind::Child(child) => {
                debug.field("parsed_child", &child.parsed_child);
            }
            ContentsKind::Children(children) => {
                let parsed: Vec<NodeId> =
                    children.last_parsed.iter().map(|item| item.node).collect();
                debug
                    .field("last_parsed", &parsed)
                    .field("repeated", &children.repeated.len());
            }
            ContentsKind::Conditional(conditional) => {
                debug
                    .field("then", &conditional.then_contents)
                    .field("else", &conditional.else_contents)
                    .field("parsed_branch", &conditional.parsed_branch);
            }
            ContentsKind::Sequential(sequence) => {
                debug.field("members", &sequence.members);
            }
        }

        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Plain = Contents<u32>;

    #[test]
    fn test_item_delimiters_use_edge_variants() {
        let list = Plain::children(Vec::new).separated_by(",");
        assert_eq!(list.item_delimiters(0, 3), (String::new(), String::new()));
        assert_eq!(list.item_delimiters(1, 3), (",".to_string(), String::new()));

        let terminated = Plain::children(Vec::new)
            .with_postlude(";")
            .with_last_postlude("");
        assert_eq!(terminated.item_delimiters(0, 2), (String::new(), ";".to_string()));
        assert_eq!(terminated.item_delimiters(1, 2), (String::new(), String::new()));
    }

    #[test]
    fn test_append_requires_sequence() {
        let mut sequence = Plain::sequence(vec![Plain::fixed("a")]);
        sequence.append(Plain::fixed("b")).unwrap();
        match sequence.kind() {
            ContentsKind::Sequential(seq) => assert_eq!(seq.members.len(), 2),
            _ => panic!("Expected sequential contents"),
        }

        let mut fixed = Plain::fixed("a");
        assert_eq!(fixed.append(Plain::fixed("b")), Err(P2ppError::NotSequential));
    }

    #[test]
    fn test_sequence_covering_is_union_of_members() {
        let first = RawSourceFragment::from_coords(1, 0, 1, 2).unwrap();
        let second = RawSourceFragment::from_coords(1, 5, 1, 6).unwrap();

        let mut a = Plain::fixed("ab");
        a.fragment = Some(first);
        let mut b = Plain::fixed("x");
        b.fragment = Some(second);

        let mut sequence = Plain::sequence(vec![a, b]);
        assert_eq!(sequence.covering_fragment(), Some(first.union(&second)));

        // Appended members have no original text and leave the union alone
        sequence.append(Plain::fixed("new")).unwrap();
        assert_eq!(sequence.covering_fragment(), Some(first.union(&second)));
    }

    #[test]
    fn test_delimiter_pending_text() {
        let unresolved = Delimiter::Unresolved {
            literal: ",".to_string(),
        };
        assert_eq!(unresolved.pending(), ",");
        assert_eq!(unresolved.fragment(), None);

        let found = Delimiter::Found {
            literal: ",".to_string(),
            fragment: RawSourceFragment::from_coords(1, 1, 1, 2).unwrap(),
        };
        assert_eq!(found.pending(), "");
        assert_eq!(found.literal(), ",");
    }
}

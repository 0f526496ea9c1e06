//! # Delimiter discovery
//!
//! Runs once after parsing. The first phase builds the parsed sub-tree so
//! every AST span is known; the second walks the tree depth-first and
//! assigns literal, prelude and postlude fragments by searching the raw text
//! outward from each boundary.
//!
//! A search tries windows of the literal's length at increasing distance
//! from the boundary. It stops at the first window that overlaps text owned
//! elsewhere in the tree, at the first window equal to the literal, or when
//! the window leaves the source. Only the second outcome reuses original
//! text; the others leave the delimiter unresolved and it is inserted on
//! render.

use p2pp_rawsource::{RawSourceFragment, RawSourcePosition};
use std::mem;
use tracing::{debug, instrument, warn};

use crate::binding::LanguageBinding;
use crate::contents::{Contents, ContentsKind, Delimiter, LiteralState, ParsedItem};
use crate::error::P2ppResult;
use crate::node::{FragmentRole, NodeId};
use crate::tree::P2ppTree;

impl<B: LanguageBinding> P2ppTree<B> {
    /// Discover delimiter fragments for the whole tree. Later calls are
    /// no-ops.
    #[instrument(skip_all)]
    pub fn initialize_pretty_print(&mut self) -> P2ppResult<()> {
        if self.initialized {
            debug!("pretty print already initialized");
            return Ok(());
        }

        let root = self.root;
        self.build_parsed_tree(root)?;
        self.discover(root)?;
        self.initialized = true;

        debug!(
            nodes = self.nodes.len(),
            fragments = self.fragments.len(),
            "pretty print initialized"
        );
        Ok(())
    }

    fn build_parsed_tree(&mut self, id: NodeId) -> P2ppResult<()> {
        let mut objects = Vec::new();
        for contents in &self.node(id)?.contents {
            collect_selected_objects(contents, &mut objects);
        }

        for object in objects {
            let known = self.node(id)?.child_for(&object).is_some();
            match self.get_object_node(id, &object) {
                Ok(child) if !known => self.build_parsed_tree(child)?,
                Ok(_) => {}
                Err(err) if err.is_contained() => {
                    warn!(node = %id, error = %err, "skipping model object without a node");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    fn discover(&mut self, id: NodeId) -> P2ppResult<()> {
        let node = self.node(id)?;
        let span = match node.span {
            Some(span) if !node.is_synthetic() && !node.discovered => span,
            _ => return Ok(()),
        };

        let mut cursor = span.start();
        let mut contents = mem::take(&mut self.node_mut(id)?.contents);
        let result = self.discover_all(id, &mut contents, &mut cursor);

        let node = self.node_mut(id)?;
        node.contents = contents;
        node.discovered = true;
        node.default_insertion_point = Some(cursor);
        result
    }

    fn discover_all(
        &mut self,
        owner: NodeId,
        contents: &mut [Contents<B::Object>],
        cursor: &mut RawSourcePosition,
    ) -> P2ppResult<()> {
        for contents in contents.iter_mut() {
            self.discover_contents(owner, contents, cursor)?;
        }
        Ok(())
    }

    fn discover_contents(
        &mut self,
        owner: NodeId,
        contents: &mut Contents<B::Object>,
        cursor: &mut RawSourcePosition,
    ) -> P2ppResult<()> {
        let prelude = contents.prelude().to_string();
        let postlude = contents.postlude().to_string();

        match &mut contents.kind {
            ContentsKind::Static(fixed) => {
                let text = fixed.text.clone();
                self.discover_literal(
                    owner,
                    &text,
                    &prelude,
                    &postlude,
                    &mut fixed.state,
                    cursor,
                )?;
                contents.fragment = literal_covering(&fixed.state);
            }
            ContentsKind::Dynamic(dynamic) => {
                let text = (dynamic.supplier)();
                self.discover_literal(
                    owner,
                    &text,
                    &prelude,
                    &postlude,
                    &mut dynamic.state,
                    cursor,
                )?;
                contents.fragment = literal_covering(&dynamic.state);
            }
            ContentsKind::Child(child) => {
                if let Some(object) = (child.supplier)() {
                    let discovered =
                        self.discover_item(owner, &object, &prelude, &postlude, cursor)?;
                    if let Some(node) = discovered {
                        child.parsed_child = Some(node);
                        contents.fragment = self.node(node)?.covering_fragment();
                    }
                }
            }
            ContentsKind::Children(children) => {
                let objects = (children.supplier)();
                let count = objects.len();
                let mut covering = None;

                for (index, object) in objects.into_iter().enumerate() {
                    if children.last_parsed.iter().any(|item| item.object == object) {
                        debug!(
                            node = %owner,
                            "model object listed twice, keeping its later text as is"
                        );
                        children.repeated.push(object);
                        continue;
                    }

                    let (item_prelude, item_postlude) =
                        children.item_delimiters(&prelude, &postlude, index, count);
                    let Some(node) =
                        self.discover_item(owner, &object, &item_prelude, &item_postlude, cursor)?
                    else {
                        continue;
                    };

                    let item_covering = self.node(node)?.covering_fragment();
                    covering = RawSourceFragment::merge(covering, item_covering);
                    children.last_parsed.push(ParsedItem {
                        object,
                        node,
                        prelude: item_prelude,
                        postlude: item_postlude,
                    });
                }
                contents.fragment = covering;
            }
            ContentsKind::Conditional(conditional) => {
                let taken = (conditional.predicate)();
                match conditional.branch_mut(taken) {
                    Some(branch) => {
                        self.discover_contents(owner, branch, cursor)?;
                        contents.fragment = branch.covering_fragment();
                        conditional.parsed_branch = Some(taken);
                    }
                    None => {
                        warn!(
                            node = %owner,
                            branch = taken,
                            "conditional has no contents for the taken branch"
                        );
                    }
                }
            }
            ContentsKind::Sequential(sequence) => {
                for member in sequence.members.iter_mut() {
                    self.discover_contents(owner, member, cursor)?;
                }
            }
        }

        if matches!(contents.kind, ContentsKind::Sequential(_)) {
            contents.covering_fragment();
        }
        Ok(())
    }

    /// Assign the literal's own fragment, then its delimiters
    fn discover_literal(
        &mut self,
        owner: NodeId,
        text: &str,
        prelude: &str,
        postlude: &str,
        state: &mut LiteralState,
        cursor: &mut RawSourcePosition,
    ) -> P2ppResult<()> {
        if state.literal.is_none() && !text.is_empty() {
            state.literal = self.find_unmapped_segment_forward_from(owner, *cursor, text)?;
            if state.literal.is_none() {
                debug!(
                    node = %owner,
                    literal = text,
                    "literal not found in source, it will be inserted"
                );
            }
        }

        let Some(literal) = state.literal else {
            return Ok(());
        };

        if !literal.is_empty() {
            self.register_fragment(owner, FragmentRole::Literal, literal)?;
        }

        state.prelude =
            self.discover_delimiter(owner, literal.start(), prelude, FragmentRole::Prelude)?;
        state.postlude =
            self.discover_delimiter(owner, literal.end(), postlude, FragmentRole::Postlude)?;
        *cursor = state.postlude.fragment().map_or(literal.end(), |fragment| fragment.end());
        Ok(())
    }

    /// Discover a child node and the item delimiters around it. Returns the
    /// child when it owns original text.
    fn discover_item(
        &mut self,
        owner: NodeId,
        object: &B::Object,
        prelude: &str,
        postlude: &str,
        cursor: &mut RawSourcePosition,
    ) -> P2ppResult<Option<NodeId>> {
        let node = match self.get_object_node(owner, object) {
            Ok(node) => node,
            Err(err) if err.is_contained() => {
                warn!(node = %owner, error = %err, "skipping model object without a node");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if self.node(node)?.discovered {
            debug!(node = %node, "model object listed twice, later occurrences render as new");
            return Ok(None);
        }

        self.discover(node)?;

        let child = self.node(node)?;
        let span = match child.span {
            Some(span) if !child.is_synthetic() => span,
            _ => return Ok(None),
        };

        let prelude = self.discover_delimiter(owner, span.start(), prelude, FragmentRole::Prelude)?;
        let postlude =
            self.discover_delimiter(owner, span.end(), postlude, FragmentRole::Postlude)?;
        *cursor = postlude.fragment().map_or(span.end(), |fragment| fragment.end());

        let child = self.node_mut(node)?;
        child.prelude = prelude;
        child.postlude = postlude;
        Ok(Some(node))
    }

    fn discover_delimiter(
        &mut self,
        owner: NodeId,
        boundary: RawSourcePosition,
        literal: &str,
        role: FragmentRole,
    ) -> P2ppResult<Delimiter> {
        if literal.is_empty() {
            return Ok(Delimiter::Absent);
        }

        let window = match role {
            FragmentRole::Prelude => {
                self.find_unmapped_segment_backward_from(owner, boundary, literal)?
            }
            _ => self.find_unmapped_segment_forward_from(owner, boundary, literal)?,
        };

        let Some(window) = window else {
            debug!(
                node = %owner,
                ?role,
                literal,
                %boundary,
                "delimiter unresolved, it will be inserted"
            );
            return Ok(Delimiter::Unresolved {
                literal: literal.to_string(),
            });
        };

        // The delimiter owns the gap between the match and the boundary
        let fragment = match role {
            FragmentRole::Prelude => RawSourceFragment::spanning(window.start(), boundary),
            _ => RawSourceFragment::spanning(boundary, window.end()),
        };
        self.register_fragment(owner, role, fragment)?;
        debug!(node = %owner, ?role, literal, %fragment, "delimiter found");

        Ok(Delimiter::Found {
            literal: literal.to_string(),
            fragment,
        })
    }

    /// Closest window ending at or before `boundary` whose text is `literal`.
    ///
    /// `None` when a window closer than the match overlaps text mapped
    /// elsewhere in the tree, or when the search reaches the start of the
    /// source.
    pub fn find_unmapped_segment_backward_from(
        &self,
        searcher: NodeId,
        boundary: RawSourcePosition,
        literal: &str,
    ) -> P2ppResult<Option<RawSourceFragment>> {
        let length = literal.chars().count();
        let end = boundary.offset(&self.source)?;

        for distance in 0.. {
            let Some(start) = end.checked_sub(length + distance) else {
                return Ok(None);
            };
            let window = RawSourceFragment::new(
                self.source.position_at_offset(start)?,
                self.source.position_at_offset(end - distance)?,
            )?;

            if let Some(found) = self.probe(searcher, window, literal)? {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Closest window starting at or after `boundary` whose text is
    /// `literal`. Stops like [`Self::find_unmapped_segment_backward_from`].
    pub fn find_unmapped_segment_forward_from(
        &self,
        searcher: NodeId,
        boundary: RawSourcePosition,
        literal: &str,
    ) -> P2ppResult<Option<RawSourceFragment>> {
        let length = literal.chars().count();
        let start = boundary.offset(&self.source)?;
        let limit = self.source.char_len();

        for distance in 0.. {
            let end = start + distance + length;
            if end > limit {
                return Ok(None);
            }
            let window = RawSourceFragment::new(
                self.source.position_at_offset(start + distance)?,
                self.source.position_at_offset(end)?,
            )?;

            if let Some(found) = self.probe(searcher, window, literal)? {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// `Some(outcome)` ends the search, `None` moves to the next window
    fn probe(
        &self,
        searcher: NodeId,
        window: RawSourceFragment,
        literal: &str,
    ) -> P2ppResult<Option<Option<RawSourceFragment>>> {
        if self.is_mapped_for_search(searcher, &window)? {
            return Ok(Some(None));
        }
        if window.raw_text(&self.source)? == literal {
            return Ok(Some(Some(window)));
        }
        Ok(None)
    }
}

fn literal_covering(state: &LiteralState) -> Option<RawSourceFragment> {
    let covering = RawSourceFragment::merge(state.literal, state.prelude.fragment());
    RawSourceFragment::merge(covering, state.postlude.fragment())
}

/// Objects referenced by the contents as currently configured: the selected
/// branch of each conditional only
fn collect_selected_objects<O: Clone>(contents: &Contents<O>, objects: &mut Vec<O>) {
    match &contents.kind {
        ContentsKind::Static(_) | ContentsKind::Dynamic(_) => {}
        ContentsKind::Child(child) => objects.extend((child.supplier)()),
        ContentsKind::Children(children) => objects.extend((children.supplier)()),
        ContentsKind::Conditional(conditional) => {
            if let Some(branch) = conditional.branch((conditional.predicate)()) {
                collect_selected_objects(branch, objects);
            }
        }
        ContentsKind::Sequential(sequence) => {
            for member in &sequence.members {
                collect_selected_objects(member, objects);
            }
        }
    }
}

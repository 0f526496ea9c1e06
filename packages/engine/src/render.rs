//! # Rendering
//!
//! Incremental rendering seeds a [`DerivedRawSource`] with a node's original
//! text and lets every contents register the edits its model changes need.
//! Unchanged parts produce no edits and come out byte-identical.
//!
//! Contents without original text render from the model (normalized) and
//! are inserted at the running insertion point. Text replaced in place is
//! used verbatim; inserted text has its continuation lines aligned with the
//! owning node's first line.

use p2pp_rawsource::{DerivedRawSource, RawSourceFragment, RawSourcePosition, SourceMapBuilder};
use std::collections::{HashMap, HashSet};
use std::mem;
use std::rc::Rc;
use tracing::{debug, instrument, warn};

use crate::binding::LanguageBinding;
use crate::context::{align_continuation, Indentation, PrettyPrintContext};
use crate::contents::{
    ChildContents, ChildrenContents, ConditionalContents, Contents, ContentsKind, Delimiter,
    LiteralState, ParsedItem,
};
use crate::error::{P2ppError, P2ppResult};
use crate::node::NodeId;
use crate::tree::P2ppTree;

/// Running state of one node's incremental render
struct Frame<'a> {
    owner: NodeId,
    derived: &'a mut DerivedRawSource,
    cursor: RawSourcePosition,
    /// Level-zero context carrying the indent unit
    unit: PrettyPrintContext,
}

impl<B: LanguageBinding> P2ppTree<B> {
    /// Text of the root node
    #[instrument(skip_all)]
    pub fn render(&mut self) -> P2ppResult<String> {
        let ctx = PrettyPrintContext::from_config(&self.config);
        let root = self.root;
        self.text_of(root, &ctx)
    }

    /// Whole document: the root's text with any source outside the root
    /// span copied around it
    pub fn render_source(&mut self) -> P2ppResult<String> {
        let text = self.render()?;
        let root = self.node(self.root)?;

        match root.last_parsed_fragment() {
            Some(span) if root.renders_incrementally() => {
                let before = self.source.text_between(self.source.start(), span.start())?;
                let after = self.source.text_between(span.end(), self.source.end())?;
                Ok(format!("{before}{text}{after}"))
            }
            _ => Ok(text),
        }
    }

    /// Root text plus a source map from it back to the original source.
    /// Text copied from the original is mapped, inserted text is not.
    pub fn render_with_source_map(
        &mut self,
        file_name: &str,
    ) -> P2ppResult<(String, SourceMapBuilder)> {
        let ctx = PrettyPrintContext::from_config(&self.config);
        let root = self.root;

        if !self.node(root)?.renders_incrementally() {
            let text = self.normalized_text_of(root, &ctx)?;
            let mut builder = SourceMapBuilder::new(file_name, &self.source.text());
            builder.advance(&text);
            return Ok((text, builder));
        }

        let derived = self.derive(root)?;
        let text = derived.string_representation()?;
        Ok((text, derived.source_map(file_name)?))
    }

    /// Current text of a node.
    ///
    /// Nodes with original text render incrementally; synthetic nodes and
    /// nodes built after initialization render normalized at `ctx`.
    #[instrument(level = "trace", skip(self, ctx))]
    pub fn text_of(&mut self, id: NodeId, ctx: &PrettyPrintContext) -> P2ppResult<String> {
        if !self.node(id)?.renders_incrementally() {
            return self.normalized_text_of(id, ctx);
        }
        Ok(self.derive(id)?.string_representation()?)
    }

    fn derive(&mut self, id: NodeId) -> P2ppResult<DerivedRawSource> {
        let span = self
            .node(id)?
            .last_parsed_fragment()
            .ok_or_else(|| P2ppError::Binding(format!("node {id} has no original text")))?;

        let mut derived = DerivedRawSource::new(Rc::clone(&self.source), span)?;
        let mut frame = Frame {
            owner: id,
            derived: &mut derived,
            cursor: span.start(),
            unit: PrettyPrintContext::from_config(&self.config),
        };

        let mut contents = mem::take(&mut self.node_mut(id)?.contents);
        let result = self.update_all(&mut frame, &mut contents);

        let cursor = frame.cursor;
        let node = self.node_mut(id)?;
        node.contents = contents;
        node.default_insertion_point = Some(cursor);

        result?;
        Ok(derived)
    }

    fn update_all(
        &mut self,
        frame: &mut Frame<'_>,
        contents: &mut [Contents<B::Object>],
    ) -> P2ppResult<()> {
        for contents in contents.iter_mut() {
            self.update_contents(frame, contents)?;
        }
        Ok(())
    }

    fn update_contents(
        &mut self,
        frame: &mut Frame<'_>,
        contents: &mut Contents<B::Object>,
    ) -> P2ppResult<()> {
        if !has_original_text(contents) {
            let unit = frame.unit.clone();
            let fresh = self.normalized_contents(frame.owner, contents, &unit)?;
            let fresh = self.insertion_text(frame.owner, fresh, contents.indentation)?;
            frame.derived.insert(frame.cursor, fresh)?;
            return Ok(());
        }

        let prelude = contents.prelude().to_string();
        let postlude = contents.postlude().to_string();
        let format = ItemFormat {
            prelude: &prelude,
            postlude: &postlude,
            indentation: contents.indentation,
        };
        let covering = contents.fragment;

        match &mut contents.kind {
            ContentsKind::Static(fixed) => {
                let text = fixed.text.clone();
                self.update_literal(frame, &text, &fixed.state)
            }
            ContentsKind::Dynamic(dynamic) => {
                let text = (dynamic.supplier)();
                self.update_literal(frame, &text, &dynamic.state)
            }
            ContentsKind::Child(child) => self.update_child(frame, child, format, covering),
            ContentsKind::Children(children) => {
                self.update_children(frame, children, format, covering)
            }
            ContentsKind::Conditional(conditional) => {
                self.update_conditional(frame, conditional, covering)
            }
            ContentsKind::Sequential(sequence) => {
                for member in sequence.members.iter_mut() {
                    self.update_contents(frame, member)?;
                }
                Ok(())
            }
        }
    }

    fn update_literal(
        &mut self,
        frame: &mut Frame<'_>,
        text: &str,
        state: &LiteralState,
    ) -> P2ppResult<()> {
        let Some(literal) = state.literal else {
            return Ok(());
        };

        frame.derived.insert(literal.start(), state.prelude.pending())?;
        if literal.raw_text(&self.source)? != text {
            frame.derived.replace(literal, text)?;
        }
        frame.derived.insert(literal.end(), state.postlude.pending())?;

        frame.cursor = state.postlude.fragment().map_or(literal.end(), |fragment| fragment.end());
        Ok(())
    }

    fn update_child(
        &mut self,
        frame: &mut Frame<'_>,
        child: &mut ChildContents<B::Object>,
        format: ItemFormat<'_>,
        covering: Option<RawSourceFragment>,
    ) -> P2ppResult<()> {
        let Some(parsed) = child.parsed_child else {
            return Ok(());
        };

        let current = (child.supplier)();
        if current.as_ref() == Some(self.node(parsed)?.object()) {
            return self.update_parsed_item(frame, parsed, None);
        }

        // Replaced by another object or gone: the old text goes as a whole
        let fresh = match current {
            Some(object) => self.fresh_item_text(frame, &object, format)?,
            None => String::new(),
        };
        match covering {
            Some(covering) => {
                frame.derived.replace(covering, fresh)?;
                frame.cursor = covering.end();
            }
            None => frame.derived.insert(frame.cursor, fresh)?,
        }
        Ok(())
    }

    /// Re-render a child that still owns its original text. With `delimiters`
    /// the item's prelude and postlude are re-anchored to new literals.
    fn update_parsed_item(
        &mut self,
        frame: &mut Frame<'_>,
        node: NodeId,
        delimiters: Option<(&str, &str)>,
    ) -> P2ppResult<()> {
        let (span, prelude, postlude) = {
            let child = self.node(node)?;
            let span = child
                .last_parsed_fragment()
                .ok_or_else(|| P2ppError::Binding(format!("parsed node {node} has no span")))?;
            (span, child.prelude.clone(), child.postlude.clone())
        };

        let (new_prelude, new_postlude) =
            delimiters.unwrap_or((prelude.literal(), postlude.literal()));
        patch_delimiter(frame, &prelude, new_prelude, span.start())?;

        let unit = frame.unit.clone();
        let text = self.text_of(node, &unit)?;
        if text != span.raw_text(&self.source)? {
            frame.derived.replace(span, text)?;
        }

        patch_delimiter(frame, &postlude, new_postlude, span.end())?;
        frame.cursor = postlude.fragment().map_or(span.end(), |fragment| fragment.end());
        Ok(())
    }

    fn update_children(
        &mut self,
        frame: &mut Frame<'_>,
        children: &mut ChildrenContents<B::Object>,
        format: ItemFormat<'_>,
        covering: Option<RawSourceFragment>,
    ) -> P2ppResult<()> {
        let current = (children.supplier)();
        let count = current.len();
        let present: HashSet<&B::Object> = current.iter().collect();

        let mut parsed_index = HashMap::new();
        for (index, item) in children.last_parsed.iter().enumerate() {
            parsed_index.entry(&item.object).or_insert(index);
        }

        // Survivors listed out of their parsed order
        let mut seen = HashSet::new();
        let mut previous: Option<usize> = None;
        let mut reordered = false;
        for object in &current {
            let Some(&index) = parsed_index.get(object) else {
                continue;
            };
            if !seen.insert(object) {
                continue;
            }
            if previous.is_some_and(|previous| index < previous) {
                reordered = true;
                break;
            }
            previous = Some(index);
        }

        if reordered {
            if let Some(covering) = covering {
                debug!(node = %frame.owner, %covering, "list items reordered, respilling");
                return self.respill_children(frame, children, &current, format, covering);
            }
        }

        let first_survivor = children
            .last_parsed
            .iter()
            .find(|item| present.contains(&item.object));
        if let Some(first) = first_survivor {
            let node = self.node(first.node)?;
            let prelude_start = node.prelude.fragment().map(|fragment| fragment.start());
            if let Some(start) = prelude_start.or(node.start()) {
                frame.cursor = start;
            }
        }

        let mut repeats: HashMap<&B::Object, usize> = HashMap::new();
        for object in &children.repeated {
            *repeats.entry(object).or_default() += 1;
        }

        let mut rendered = HashSet::new();
        for (index, object) in current.iter().enumerate() {
            let (item_prelude, item_postlude) =
                children.item_delimiters(format.prelude, format.postlude, index, count);

            match parsed_index.get(object) {
                Some(&parsed) if rendered.insert(object) => {
                    let node = children.last_parsed[parsed].node;
                    self.update_parsed_item(frame, node, Some((&item_prelude, &item_postlude)))?;
                }
                Some(_) if repeats.get(object).is_some_and(|&left| left > 0) => {
                    // Still backed by its original text
                    if let Some(left) = repeats.get_mut(object) {
                        *left -= 1;
                    }
                }
                _ => {
                    let item = ItemFormat {
                        prelude: &item_prelude,
                        postlude: &item_postlude,
                        indentation: format.indentation,
                    };
                    let fresh = self.fresh_item_text(frame, object, item)?;
                    frame.derived.insert(frame.cursor, fresh)?;
                }
            }
        }

        for (index, item) in children.last_parsed.iter().enumerate() {
            if present.contains(&item.object) {
                continue;
            }
            if let Some(removed) = self.removed_item_fragment(&children.last_parsed, index)? {
                frame.derived.remove(removed)?;
            }
        }
        Ok(())
    }

    /// Text to delete for a removed list item: its covering fragment, plus
    /// the whitespace before it when no prelude owns that gap
    fn removed_item_fragment(
        &self,
        parsed: &[ParsedItem<B::Object>],
        index: usize,
    ) -> P2ppResult<Option<RawSourceFragment>> {
        let node = self.node(parsed[index].node)?;
        let Some(removed) = node.covering_fragment() else {
            return Ok(None);
        };
        if node.prelude.fragment().is_some() || index == 0 {
            return Ok(Some(removed));
        }

        let before = match self.node(parsed[index - 1].node)?.covering_fragment() {
            Some(before) if before.end() < removed.start() => before,
            _ => return Ok(Some(removed)),
        };
        let gap = RawSourceFragment::spanning(before.end(), removed.start());
        if gap.raw_text(&self.source)?.trim().is_empty() {
            Ok(Some(gap.union(&removed)))
        } else {
            Ok(Some(removed))
        }
    }

    /// Rebuild a reordered list over its whole covering fragment. Survivors
    /// keep their own text; delimiters come from the configured literals.
    fn respill_children(
        &mut self,
        frame: &mut Frame<'_>,
        children: &ChildrenContents<B::Object>,
        current: &[B::Object],
        format: ItemFormat<'_>,
        covering: RawSourceFragment,
    ) -> P2ppResult<()> {
        let count = current.len();
        let mut text = String::new();

        for (index, object) in current.iter().enumerate() {
            let (item_prelude, item_postlude) =
                children.item_delimiters(format.prelude, format.postlude, index, count);
            let item = ItemFormat {
                prelude: &item_prelude,
                postlude: &item_postlude,
                indentation: format.indentation,
            };
            text.push_str(&self.fresh_item_text(frame, object, item)?);
        }

        frame.derived.replace(covering, text)?;
        frame.cursor = covering.end();
        Ok(())
    }

    fn update_conditional(
        &mut self,
        frame: &mut Frame<'_>,
        conditional: &mut ConditionalContents<B::Object>,
        covering: Option<RawSourceFragment>,
    ) -> P2ppResult<()> {
        let taken = (conditional.predicate)();

        if conditional.parsed_branch == Some(taken) {
            return match conditional.branch_mut(taken) {
                Some(branch) => self.update_contents(frame, branch),
                None => Ok(()),
            };
        }

        // The other branch owns the original text
        let fresh = match conditional.branch(taken) {
            Some(branch) => {
                let unit = frame.unit.clone();
                let fresh = self.normalized_contents(frame.owner, branch, &unit)?;
                self.insertion_text(frame.owner, fresh, branch.indentation)?
            }
            None => {
                warn!(
                    node = %frame.owner,
                    branch = taken,
                    "conditional has no contents for the taken branch"
                );
                String::new()
            }
        };

        match covering {
            Some(covering) => {
                frame.derived.replace(covering, fresh)?;
                frame.cursor = covering.end();
            }
            None => frame.derived.insert(frame.cursor, fresh)?,
        }
        Ok(())
    }

    /// Text for an item that has no original text at this position
    fn fresh_item_text(
        &mut self,
        frame: &Frame<'_>,
        object: &B::Object,
        item: ItemFormat<'_>,
    ) -> P2ppResult<String> {
        let Some(body) = self.object_text(frame.owner, object, &frame.unit)? else {
            return Ok(String::new());
        };
        let text = frame
            .unit
            .derive(item.indentation)
            .indent(&format!("{}{body}{}", item.prelude, item.postlude));
        self.insertion_text(frame.owner, text, item.indentation)
    }

    /// Text of the child node for `object`, or `None` when the binding
    /// cannot make one
    fn object_text(
        &mut self,
        owner: NodeId,
        object: &B::Object,
        ctx: &PrettyPrintContext,
    ) -> P2ppResult<Option<String>> {
        match self.get_object_node(owner, object) {
            Ok(node) => Ok(Some(self.text_of(node, ctx)?)),
            Err(err) if err.is_contained() => {
                warn!(node = %owner, error = %err, "rendering model object as empty");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn insertion_text(
        &self,
        owner: NodeId,
        text: String,
        indentation: Indentation,
    ) -> P2ppResult<String> {
        if !self.config.align_insertions || indentation == Indentation::Reset {
            return Ok(text);
        }

        Ok(match self.node(owner)?.start() {
            Some(start) => align_continuation(&text, self.source.line_indentation(start.line)),
            None => text,
        })
    }

    /// Text of a node rendered purely from the model, indented at `ctx`
    #[instrument(level = "trace", skip(self, ctx))]
    pub fn normalized_text_of(
        &mut self,
        id: NodeId,
        ctx: &PrettyPrintContext,
    ) -> P2ppResult<String> {
        let unit = ctx.relative();
        let contents = mem::take(&mut self.node_mut(id)?.contents);
        let result = self.normalized_all(id, &contents, &unit);
        self.node_mut(id)?.contents = contents;
        Ok(ctx.indent(&result?))
    }

    fn normalized_all(
        &mut self,
        owner: NodeId,
        contents: &[Contents<B::Object>],
        unit: &PrettyPrintContext,
    ) -> P2ppResult<String> {
        let mut text = String::new();
        for member in contents {
            text.push_str(&self.normalized_contents(owner, member, unit)?);
        }
        Ok(text)
    }

    /// One contents rendered from the model against a level-zero context
    fn normalized_contents(
        &mut self,
        owner: NodeId,
        contents: &Contents<B::Object>,
        unit: &PrettyPrintContext,
    ) -> P2ppResult<String> {
        let body = match &contents.kind {
            ContentsKind::Static(fixed) => fixed.text.clone(),
            ContentsKind::Dynamic(dynamic) => (dynamic.supplier)(),
            ContentsKind::Child(child) => {
                let text = match (child.supplier)() {
                    Some(object) => self.object_text(owner, &object, unit)?,
                    None => None,
                };
                match text {
                    Some(text) => text,
                    None => return Ok(String::new()),
                }
            }
            ContentsKind::Children(children) => {
                let objects = (children.supplier)();
                let count = objects.len();
                let mut text = String::new();

                for (index, object) in objects.iter().enumerate() {
                    let Some(body) = self.object_text(owner, object, unit)? else {
                        continue;
                    };
                    let (prelude, postlude) = children.item_delimiters(
                        contents.prelude(),
                        contents.postlude(),
                        index,
                        count,
                    );
                    text.push_str(&prelude);
                    text.push_str(&body);
                    text.push_str(&postlude);
                }
                return Ok(unit.derive(contents.indentation).indent(&text));
            }
            ContentsKind::Conditional(conditional) => {
                let taken = (conditional.predicate)();
                match conditional.branch(taken) {
                    Some(branch) => self.normalized_contents(owner, branch, unit)?,
                    None => {
                        warn!(
                            node = %owner,
                            branch = taken,
                            "conditional has no contents for the taken branch"
                        );
                        return Ok(String::new());
                    }
                }
            }
            ContentsKind::Sequential(sequence) => {
                self.normalized_all(owner, &sequence.members, unit)?
            }
        };

        Ok(unit
            .derive(contents.indentation)
            .indent(&format!("{}{body}{}", contents.prelude(), contents.postlude())))
    }
}

/// Delimiters and indentation applied around items
#[derive(Clone, Copy)]
struct ItemFormat<'a> {
    prelude: &'a str,
    postlude: &'a str,
    indentation: Indentation,
}

/// Whether a contents took part in discovery and owns original text to
/// update in place
fn has_original_text<O>(contents: &Contents<O>) -> bool {
    match &contents.kind {
        ContentsKind::Static(fixed) => fixed.state.literal.is_some(),
        ContentsKind::Dynamic(dynamic) => dynamic.state.literal.is_some(),
        ContentsKind::Child(child) => child.parsed_child.is_some(),
        ContentsKind::Children(children) => !children.last_parsed.is_empty(),
        ContentsKind::Conditional(conditional) => conditional.parsed_branch.is_some(),
        ContentsKind::Sequential(_) => true,
    }
}

/// Bring a discovered delimiter in line with the literal its item needs now
fn patch_delimiter(
    frame: &mut Frame<'_>,
    delimiter: &Delimiter,
    literal: &str,
    anchor: RawSourcePosition,
) -> P2ppResult<()> {
    match delimiter {
        Delimiter::Found {
            literal: found,
            fragment,
        } => {
            if found != literal {
                frame.derived.replace(*fragment, literal)?;
            }
        }
        Delimiter::Absent | Delimiter::Unresolved { .. } => frame.derived.insert(anchor, literal)?,
    }
    Ok(())
}

//! # Derived sources
//!
//! A [`DerivedRawSource`] is the original text of one fragment plus a set
//! of positional edits expressed in the original coordinates. Folding the
//! edits over the base text yields the re-serialized text; everything not
//! covered by an edit is copied verbatim.
//!
//! Edit targets never overlap. Two edits on intersecting fragments mean the
//! caller's fragment bookkeeping is inconsistent, so registration fails with
//! [`SourceError::ConflictingEdit`].

use std::rc::Rc;
use tracing::trace;

use crate::builder::SourceMapBuilder;
use crate::error::{SourceError, SourceResult};
use crate::{RawSource, RawSourceFragment, RawSourcePosition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Replace,
    Insert,
    Remove,
}

/// One registered edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    /// Original text being replaced (zero-length for insertions)
    pub target: RawSourceFragment,
    pub text: String,
    /// Registration order, breaks ties between insertions at one position
    seq: usize,
}

impl Edit {
    fn sort_key(&self) -> (RawSourcePosition, RawSourcePosition, usize) {
        (self.target.start(), self.target.end(), self.seq)
    }
}

#[derive(Debug, Clone)]
pub struct DerivedRawSource {
    source: Rc<RawSource>,
    base: RawSourceFragment,
    edits: Vec<Edit>,
}

impl DerivedRawSource {
    pub fn new(source: Rc<RawSource>, base: RawSourceFragment) -> SourceResult<Self> {
        source.validate_fragment(&base)?;
        Ok(Self {
            source,
            base,
            edits: Vec::new(),
        })
    }

    pub fn source(&self) -> &RawSource {
        &self.source
    }

    pub fn base(&self) -> RawSourceFragment {
        self.base
    }

    pub fn is_unchanged(&self) -> bool {
        self.edits.is_empty()
    }

    /// Registered edits in application order
    pub fn edits(&self) -> Vec<&Edit> {
        let mut edits: Vec<&Edit> = self.edits.iter().collect();
        edits.sort_by_key(|edit| edit.sort_key());
        edits
    }

    pub fn replace(
        &mut self,
        fragment: RawSourceFragment,
        text: impl Into<String>,
    ) -> SourceResult<()> {
        self.register(EditKind::Replace, fragment, text.into())
    }

    pub fn insert(
        &mut self,
        position: RawSourcePosition,
        text: impl Into<String>,
    ) -> SourceResult<()> {
        let text = text.into();
        if text.is_empty() {
            return Ok(());
        }
        self.register(EditKind::Insert, RawSourceFragment::empty_at(position), text)
    }

    pub fn remove(&mut self, fragment: RawSourceFragment) -> SourceResult<()> {
        if fragment.is_empty() {
            return Ok(());
        }
        self.register(EditKind::Remove, fragment, String::new())
    }

    fn register(
        &mut self,
        kind: EditKind,
        target: RawSourceFragment,
        text: String,
    ) -> SourceResult<()> {
        self.source.validate_fragment(&target)?;

        if !self.base.contains(&target) {
            return Err(SourceError::FragmentOutsideBase {
                fragment: target,
                base: self.base,
            });
        }

        if let Some(existing) = self.edits.iter().find(|edit| edit.target.intersects(&target)) {
            return Err(SourceError::ConflictingEdit {
                existing: existing.target,
                incoming: target,
            });
        }

        trace!(?kind, %target, text = %text, "registering edit");

        let seq = self.edits.len();
        self.edits.push(Edit {
            kind,
            target,
            text,
            seq,
        });
        Ok(())
    }

    /// Fold the edits over the base text
    pub fn string_representation(&self) -> SourceResult<String> {
        let mut output = String::new();
        let mut cursor = self.base.start();

        for edit in self.edits() {
            output.push_str(&self.source.text_between(cursor, edit.target.start())?);
            output.push_str(&edit.text);
            cursor = edit.target.end();
        }

        output.push_str(&self.source.text_between(cursor, self.base.end())?);
        Ok(output)
    }

    /// Source map from the derived text back to the original source.
    ///
    /// Every verbatim span gets a mapping at its start and at the start of
    /// each of its lines; inserted text is left unmapped.
    pub fn source_map(&self, file_name: &str) -> SourceResult<SourceMapBuilder> {
        let mut builder = SourceMapBuilder::new(file_name, &self.source.text());
        let mut cursor = self.base.start();

        for edit in self.edits() {
            self.map_verbatim(&mut builder, cursor, edit.target.start())?;
            builder.advance(&edit.text);
            cursor = edit.target.end();
        }
        self.map_verbatim(&mut builder, cursor, self.base.end())?;

        Ok(builder)
    }

    fn map_verbatim(
        &self,
        builder: &mut SourceMapBuilder,
        start: RawSourcePosition,
        end: RawSourcePosition,
    ) -> SourceResult<()> {
        if start == end {
            return Ok(());
        }

        builder.map_to(start);
        let text = self.source.text_between(start, end)?;
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                builder.advance("\n");
                builder.map_to(RawSourcePosition::new(start.line + index, 0));
            }
            builder.advance(line);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn derived(text: &str) -> DerivedRawSource {
        let source = Rc::new(RawSource::new(text));
        let base = source.full_fragment();
        DerivedRawSource::new(source, base).unwrap()
    }

    fn frag(sl: usize, sc: usize, el: usize, ec: usize) -> RawSourceFragment {
        RawSourceFragment::from_coords(sl, sc, el, ec).unwrap()
    }

    #[test]
    fn test_no_edits_is_verbatim() {
        let derived = derived("keep\nthis\n");
        assert!(derived.is_unchanged());
        assert_eq!(derived.string_representation().unwrap(), "keep\nthis\n");
    }

    #[test]
    fn test_edits_apply_in_position_order() {
        let mut derived = derived("alpha beta\ngamma");
        // Registered out of order on purpose
        derived.replace(frag(2, 0, 2, 5), "delta").unwrap();
        derived.remove(frag(1, 5, 1, 10)).unwrap();
        derived.insert(RawSourcePosition::new(1, 0), ">> ").unwrap();

        assert_eq!(derived.string_representation().unwrap(), ">> alpha\ndelta");
    }

    #[test]
    fn test_insertions_at_same_position_keep_order() {
        let mut derived = derived("ac");
        derived.insert(RawSourcePosition::new(1, 1), "b").unwrap();
        derived.insert(RawSourcePosition::new(1, 1), "B").unwrap();
        assert_eq!(derived.string_representation().unwrap(), "abBc");
    }

    #[test]
    fn test_insert_before_replacement_at_same_start() {
        let mut derived = derived("x = 1");
        derived.replace(frag(1, 4, 1, 5), "2").unwrap();
        derived.insert(RawSourcePosition::new(1, 4), "-").unwrap();
        derived.insert(RawSourcePosition::new(1, 5), ";").unwrap();
        assert_eq!(derived.string_representation().unwrap(), "x = -2;");
    }

    #[test]
    fn test_overlapping_edits_conflict() {
        let mut derived = derived("abcdef");
        derived.replace(frag(1, 1, 1, 4), "X").unwrap();

        let err = derived.remove(frag(1, 3, 1, 5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConflictingEdit);

        let err = derived.insert(RawSourcePosition::new(1, 2), "!").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConflictingEdit);

        // Touching edits are fine
        derived.replace(frag(1, 4, 1, 6), "Y").unwrap();
        assert_eq!(derived.string_representation().unwrap(), "aXY");
    }

    #[test]
    fn test_edit_outside_base() {
        let source = Rc::new(RawSource::new("outer [inner] outer"));
        let base = frag(1, 6, 1, 13);
        let mut derived = DerivedRawSource::new(source, base).unwrap();

        let err = derived.replace(frag(1, 0, 1, 5), "x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FragmentOutsideBase);

        derived.replace(frag(1, 7, 1, 12), "INNER").unwrap();
        assert_eq!(derived.string_representation().unwrap(), "[INNER]");
    }

    #[test]
    fn test_multiline_splice() {
        let mut derived = derived("fn a() {\n\tbody\n}\n");
        derived.replace(frag(2, 1, 2, 5), "first\n\tsecond").unwrap();
        assert_eq!(
            derived.string_representation().unwrap(),
            "fn a() {\n\tfirst\n\tsecond\n}\n"
        );
    }

    #[test]
    fn test_source_map_points_back_to_original() {
        let mut derived = derived("ab\ncd");
        derived.insert(RawSourcePosition::new(1, 0), "new\n").unwrap();

        let map = derived.source_map("list.txt").unwrap().build();
        // Generated line 1 ("ab") comes from original line 0 (0-based)
        let token = map.lookup_token(1, 0).unwrap();
        assert_eq!(token.get_src_line(), 0);
        assert_eq!(token.get_src_col(), 0);

        let token = map.lookup_token(2, 1).unwrap();
        assert_eq!(token.get_src_line(), 1);
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SourceError, SourceResult};
use crate::{RawSource, RawSourcePosition};

/// Half-open span `[start, end)` of a [`RawSource`]
///
/// The constructor guarantees `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawSourceFragment {
    start: RawSourcePosition,
    end: RawSourcePosition,
}

impl RawSourceFragment {
    pub fn new(start: RawSourcePosition, end: RawSourcePosition) -> SourceResult<Self> {
        if start > end {
            return Err(SourceError::InvalidFragment { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build from `(start line, start column, end line, end column)`
    pub fn from_coords(
        start_line: usize,
        start_column: usize,
        end_line: usize,
        end_column: usize,
    ) -> SourceResult<Self> {
        Self::new(
            RawSourcePosition::new(start_line, start_column),
            RawSourcePosition::new(end_line, end_column),
        )
    }

    /// Zero-length fragment at `position`
    pub fn empty_at(position: RawSourcePosition) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    /// Fragment between two positions in either order
    pub fn spanning(a: RawSourcePosition, b: RawSourcePosition) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> RawSourcePosition {
        self.start
    }

    pub fn end(&self) -> RawSourcePosition {
        self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Literal text covered by this fragment
    pub fn raw_text(&self, source: &RawSource) -> SourceResult<String> {
        source.text_between(self.start, self.end)
    }

    /// Number of characters covered, counting line breaks
    pub fn char_len(&self, source: &RawSource) -> SourceResult<usize> {
        Ok(self.end.offset(source)? - self.start.offset(source)?)
    }

    /// Strict overlap test.
    ///
    /// Fragments that merely touch do not intersect, and a zero-length
    /// fragment only intersects a fragment that strictly surrounds it.
    pub fn intersects(&self, other: &RawSourceFragment) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Smallest fragment enclosing both
    pub fn union(&self, other: &RawSourceFragment) -> RawSourceFragment {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn contains(&self, other: &RawSourceFragment) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains_position(&self, position: RawSourcePosition) -> bool {
        self.start <= position && position <= self.end
    }

    /// Union of an optional accumulator with another fragment
    pub fn merge(acc: Option<RawSourceFragment>, other: Option<RawSourceFragment>) -> Option<Self> {
        match (acc, other) {
            (Some(a), Some(b)) => Some(a.union(&b)),
            (a, b) => a.or(b),
        }
    }
}

impl fmt::Display for RawSourceFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

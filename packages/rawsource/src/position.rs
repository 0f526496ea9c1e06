use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SourceError, SourceResult};
use crate::RawSource;

/// Cursor into a [`RawSource`]
///
/// `line` is 1-based. `column` counts characters and means "before the
/// column-th character", so column 0 is the start of the line and
/// `column == line length` is the end of it. Ordering is by line, then
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RawSourcePosition {
    pub line: usize,
    pub column: usize,
}

impl RawSourcePosition {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Start of the first line
    pub const fn origin() -> Self {
        Self { line: 1, column: 0 }
    }

    /// Position just before the `index`-th character (1-based) of `line`
    pub fn before_char(line: usize, index: usize) -> Self {
        Self {
            line,
            column: index.saturating_sub(1),
        }
    }

    /// Position just after the `index`-th character (1-based) of `line`
    pub fn after_char(line: usize, index: usize) -> Self {
        Self {
            line,
            column: index,
        }
    }

    /// Step one character forward, moving onto the next line after the
    /// end of the current one.
    pub fn increment(self, source: &RawSource) -> SourceResult<Self> {
        let len = source
            .line_len(self.line)
            .ok_or_else(|| SourceError::out_of_bounds(self, source.size()))?;

        if self.column < len {
            Ok(Self::new(self.line, self.column + 1))
        } else if self.column == len && self.line < source.size() {
            Ok(Self::new(self.line + 1, 0))
        } else {
            Err(SourceError::StepOutOfBounds {
                position: self,
                direction: "forward",
                reason: "already at the end of the source",
            })
        }
    }

    /// Step one character backward, moving to the end of the previous line
    /// from column 0.
    pub fn decrement(self, source: &RawSource) -> SourceResult<Self> {
        let len = source
            .line_len(self.line)
            .ok_or_else(|| SourceError::out_of_bounds(self, source.size()))?;

        if self.column > len {
            return Err(SourceError::StepOutOfBounds {
                position: self,
                direction: "backward",
                reason: "column is past the end of its line",
            });
        }

        if self.column > 0 {
            Ok(Self::new(self.line, self.column - 1))
        } else if self.line > 1 {
            let previous = source
                .line_len(self.line - 1)
                .ok_or_else(|| SourceError::out_of_bounds(self, source.size()))?;
            Ok(Self::new(self.line - 1, previous))
        } else {
            Err(SourceError::StepOutOfBounds {
                position: self,
                direction: "backward",
                reason: "already at the start of the source",
            })
        }
    }

    /// Absolute character offset, counting one character per line break.
    pub fn offset(self, source: &RawSource) -> SourceResult<usize> {
        source.validate(self)?;
        Ok(source.line_start_offset(self.line) + self.column)
    }

    /// Inverse of [`RawSourcePosition::offset`].
    pub fn from_offset(source: &RawSource, offset: usize) -> SourceResult<Self> {
        source.position_at_offset(offset)
    }
}

impl Default for RawSourcePosition {
    fn default() -> Self {
        Self::origin()
    }
}

impl fmt::Display for RawSourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

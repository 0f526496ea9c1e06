use crate::error::{SourceError, SourceResult};
use crate::{RawSourceFragment, RawSourcePosition};

/// Immutable, line-indexed view of the original input text
///
/// The text is split on `'\n'` only, so joining the lines back with a single
/// newline reproduces the input exactly (a trailing newline shows up as a
/// final empty line, and `'\r'` stays part of its line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSource {
    lines: Vec<String>,
    /// Character count of each line
    line_lens: Vec<usize>,
    /// Character offset of the start of each line
    line_starts: Vec<usize>,
}

impl RawSource {
    pub fn new(text: &str) -> Self {
        let lines: Vec<String> = text.split('\n').map(str::to_string).collect();
        let line_lens: Vec<usize> = lines.iter().map(|line| line.chars().count()).collect();

        let mut line_starts = Vec::with_capacity(lines.len());
        let mut offset = 0;
        for len in &line_lens {
            line_starts.push(offset);
            offset += len + 1;
        }

        Self {
            lines,
            line_lens,
            line_starts,
        }
    }

    /// Number of lines (never zero: the empty text has one empty line)
    pub fn size(&self) -> usize {
        self.lines.len()
    }

    /// 1-based line access, for diagnostics
    pub fn row(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .map(String::as_str)
    }

    pub fn line_len(&self, line: usize) -> Option<usize> {
        line.checked_sub(1).and_then(|index| self.line_lens.get(index)).copied()
    }

    /// Leading spaces and tabs of `line`
    pub fn line_indentation(&self, line: usize) -> &str {
        match self.row(line) {
            Some(row) => {
                let trimmed = row.trim_start_matches([' ', '\t']);
                &row[..row.len() - trimmed.len()]
            }
            None => "",
        }
    }

    /// Total number of characters, counting one per line break
    pub fn char_len(&self) -> usize {
        let last = self.lines.len() - 1;
        self.line_starts[last] + self.line_lens[last]
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn start(&self) -> RawSourcePosition {
        RawSourcePosition::origin()
    }

    pub fn end(&self) -> RawSourcePosition {
        let last = self.lines.len();
        RawSourcePosition::new(last, self.line_lens[last - 1])
    }

    /// Fragment spanning the whole source
    pub fn full_fragment(&self) -> RawSourceFragment {
        RawSourceFragment::spanning(self.start(), self.end())
    }

    pub fn validate(&self, position: RawSourcePosition) -> SourceResult<()> {
        match self.line_len(position.line) {
            Some(len) if position.column <= len => Ok(()),
            _ => Err(SourceError::out_of_bounds(position, self.size())),
        }
    }

    pub fn validate_fragment(&self, fragment: &RawSourceFragment) -> SourceResult<()> {
        self.validate(fragment.start())?;
        self.validate(fragment.end())
    }

    /// Offset of the first character of `line`. The line must exist.
    pub(crate) fn line_start_offset(&self, line: usize) -> usize {
        self.line_starts[line - 1]
    }

    pub fn position_at_offset(&self, offset: usize) -> SourceResult<RawSourcePosition> {
        if offset > self.char_len() {
            return Err(SourceError::out_of_bounds(
                RawSourcePosition::new(self.size() + 1, 0),
                self.size(),
            ));
        }

        // Last line starting at or before the offset
        let index = self.line_starts.partition_point(|start| *start <= offset) - 1;
        Ok(RawSourcePosition::new(index + 1, offset - self.line_starts[index]))
    }

    /// Literal text in `[start, end)`, reinserting newlines between lines
    pub fn text_between(
        &self,
        start: RawSourcePosition,
        end: RawSourcePosition,
    ) -> SourceResult<String> {
        self.validate(start)?;
        self.validate(end)?;
        if start > end {
            return Err(SourceError::InvalidFragment { start, end });
        }

        if start.line == end.line {
            return Ok(char_slice(&self.lines[start.line - 1], start.column, Some(end.column)));
        }

        let mut text = char_slice(&self.lines[start.line - 1], start.column, None);
        for line in &self.lines[start.line..end.line - 1] {
            text.push('\n');
            text.push_str(line);
        }
        text.push('\n');
        text.push_str(&char_slice(&self.lines[end.line - 1], 0, Some(end.column)));

        Ok(text)
    }
}

fn char_slice(line: &str, from: usize, to: Option<usize>) -> String {
    let chars = line.chars().skip(from);
    match to {
        Some(to) => chars.take(to.saturating_sub(from)).collect(),
        None => chars.collect(),
    }
}

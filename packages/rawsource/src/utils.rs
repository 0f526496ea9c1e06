//! Conversions between byte offsets and [`RawSourcePosition`]s.
//!
//! Parsers usually report byte spans. These helpers let a fragment
//! retriever turn them into character-based positions.

use crate::error::SourceResult;
use crate::{RawSourceFragment, RawSourcePosition};

/// Convert a byte offset into a position (1-based line, character column)
///
/// Offsets past the end clamp to the end of the text.
pub fn byte_offset_to_position(text: &str, offset: usize) -> RawSourcePosition {
    let mut line = 1;
    let mut column = 0;

    for (byte_pos, ch) in text.char_indices() {
        if byte_pos >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }

    RawSourcePosition::new(line, column)
}

/// Convert a position back into a byte offset
///
/// Positions past the end of the text return `text.len()`.
pub fn position_to_byte_offset(text: &str, position: RawSourcePosition) -> usize {
    let mut line = 1;
    let mut column = 0;

    for (byte_pos, ch) in text.char_indices() {
        if line == position.line && column == position.column {
            return byte_pos;
        }

        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }

    text.len()
}

/// Fragment covering the byte span `start..end` of `text`
pub fn fragment_from_byte_span(
    text: &str,
    start: usize,
    end: usize,
) -> SourceResult<RawSourceFragment> {
    RawSourceFragment::new(
        byte_offset_to_position(text, start),
        byte_offset_to_position(text, end),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_offset_to_position() {
        let text = "line 1\nline 2\nline 3";

        assert_eq!(byte_offset_to_position(text, 0), RawSourcePosition::new(1, 0));
        assert_eq!(byte_offset_to_position(text, 7), RawSourcePosition::new(2, 0));
        assert_eq!(byte_offset_to_position(text, 10), RawSourcePosition::new(2, 3));
        assert_eq!(byte_offset_to_position(text, 14), RawSourcePosition::new(3, 0));
    }

    #[test]
    fn test_position_to_byte_offset() {
        let text = "line 1\nline 2\nline 3";

        assert_eq!(position_to_byte_offset(text, RawSourcePosition::new(1, 0)), 0);
        assert_eq!(position_to_byte_offset(text, RawSourcePosition::new(2, 0)), 7);
        assert_eq!(position_to_byte_offset(text, RawSourcePosition::new(2, 3)), 10);
        assert_eq!(position_to_byte_offset(text, RawSourcePosition::new(3, 0)), 14);
    }

    #[test]
    fn test_unicode_columns_count_chars() {
        let text = "日本語\ntext";

        // Three 3-byte characters, then the newline
        assert_eq!(byte_offset_to_position(text, 6), RawSourcePosition::new(1, 2));
        assert_eq!(byte_offset_to_position(text, 10), RawSourcePosition::new(2, 0));
        assert_eq!(position_to_byte_offset(text, RawSourcePosition::new(1, 2)), 6);
    }

    #[test]
    fn test_out_of_bounds() {
        let text = "short";

        assert_eq!(byte_offset_to_position(text, 1000), RawSourcePosition::new(1, 5));
        assert_eq!(position_to_byte_offset(text, RawSourcePosition::new(10, 0)), text.len());
    }

    #[test]
    fn test_fragment_from_byte_span() {
        let text = "a, b";
        let fragment = fragment_from_byte_span(text, 3, 4).unwrap();
        assert_eq!(fragment.start(), RawSourcePosition::new(1, 3));
        assert_eq!(fragment.end(), RawSourcePosition::new(1, 4));
    }
}

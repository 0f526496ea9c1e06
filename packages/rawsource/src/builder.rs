use sourcemap::{SourceMap as ExternalSourceMap, SourceMapBuilder as ExternalBuilder};

use crate::RawSourcePosition;

/// Source map from emitted derived text back to the original source.
///
/// Generated positions are tracked as text is fed through [`advance`]; each
/// [`map_to`] pins the current generated position to an original one.
///
/// [`advance`]: SourceMapBuilder::advance
/// [`map_to`]: SourceMapBuilder::map_to
pub struct SourceMapBuilder {
    inner: ExternalBuilder,
    source_id: u32,
    generated: (u32, u32),
}

impl SourceMapBuilder {
    pub fn new(file_name: &str, original_text: &str) -> Self {
        let mut inner = ExternalBuilder::new(None);
        let source_id = inner.add_source(file_name);
        inner.set_source_contents(source_id, Some(original_text));
        Self {
            inner,
            source_id,
            generated: (0, 0),
        }
    }

    /// Pin the current generated position to `original`
    pub fn map_to(&mut self, original: RawSourcePosition) {
        let (line, column) = self.generated;
        // Positions are 1-based in lines, source maps are 0-based
        let src_line = original.line.saturating_sub(1) as u32;
        self.inner.add_raw(
            line,
            column,
            src_line,
            original.column as u32,
            Some(self.source_id),
            None,
            false,
        );
    }

    /// Move the generated position past `text`
    pub fn advance(&mut self, text: &str) {
        let (line, column) = &mut self.generated;
        match text.rfind('\n') {
            Some(last) => {
                *line += text.matches('\n').count() as u32;
                *column = text[last + 1..].chars().count() as u32;
            }
            None => *column += text.chars().count() as u32,
        }
    }

    /// Current (line, column) in the generated text, both 0-based
    pub fn current_position(&self) -> (u32, u32) {
        self.generated
    }

    pub fn build(self) -> ExternalSourceMap {
        self.inner.into_sourcemap()
    }

    pub fn to_json(self) -> Result<String, sourcemap::Error> {
        let mut out = Vec::new();
        self.build().to_writer(&mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracking() {
        let mut builder = SourceMapBuilder::new("list.txt", "a,b");
        assert_eq!(builder.current_position(), (0, 0));

        builder.advance("a,b,");
        assert_eq!(builder.current_position(), (0, 4));

        builder.advance("\nd");
        assert_eq!(builder.current_position(), (1, 1));
    }

    #[test]
    fn test_map_to_uses_zero_based_lines() {
        let mut builder = SourceMapBuilder::new("list.txt", "a\nb");
        builder.advance("xx");
        builder.map_to(RawSourcePosition::new(2, 0));

        let map = builder.build();
        assert_eq!(map.get_source(0), Some("list.txt"));
        let token = map.lookup_token(0, 2).unwrap();
        assert_eq!(token.get_src_line(), 1);
    }

    #[test]
    fn test_map_after_multiline_advance() {
        let mut builder = SourceMapBuilder::new("list.txt", "a,\nbc");
        builder.advance("a,\nx");
        builder.map_to(RawSourcePosition::new(2, 1));
        assert_eq!(builder.current_position(), (1, 1));

        let map = builder.build();
        let token = map.lookup_token(1, 1).unwrap();
        assert_eq!((token.get_src_line(), token.get_src_col()), (1, 1));
    }

    #[test]
    fn test_json_output() {
        let mut builder = SourceMapBuilder::new("list.txt", "a,b");
        builder.map_to(RawSourcePosition::origin());

        let json = builder.to_json().unwrap();
        assert!(json.contains("\"version\":3"));
        assert!(json.contains("list.txt"));
    }
}

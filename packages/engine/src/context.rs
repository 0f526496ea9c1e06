use serde::{Deserialize, Serialize};

use crate::config::PrettyPrintConfig;

/// Relative indentation directive carried by every contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Indentation {
    /// Stay at the caller's level
    #[default]
    Keep,
    /// Nest this many levels deeper
    Nest(usize),
    /// Drop back to level zero
    Reset,
}

impl Indentation {
    pub const INDENT: Indentation = Indentation::Nest(1);
    pub const DO_NOT_INDENT: Indentation = Indentation::Keep;

    /// `0` keeps the level, `+N` nests, any negative value resets
    pub fn from_relative(relative: i32) -> Self {
        match relative {
            0 => Indentation::Keep,
            n if n < 0 => Indentation::Reset,
            n => Indentation::Nest(n as usize),
        }
    }
}

/// Indentation state threaded through normalized rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrettyPrintContext {
    level: usize,
    unit: String,
}

impl PrettyPrintContext {
    pub fn new() -> Self {
        Self::with_unit("\t")
    }

    pub fn with_unit(unit: impl Into<String>) -> Self {
        Self {
            level: 0,
            unit: unit.into(),
        }
    }

    pub fn from_config(config: &PrettyPrintConfig) -> Self {
        Self::with_unit(config.indent_unit.clone())
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn derive(&self, indentation: Indentation) -> Self {
        let level = match indentation {
            Indentation::Keep => self.level,
            Indentation::Nest(n) => self.level + n,
            Indentation::Reset => 0,
        };
        Self {
            level,
            unit: self.unit.clone(),
        }
    }

    /// Level-zero context with the same unit. A node renders its contents
    /// against this and indents the result once, so nesting adds up.
    pub fn relative(&self) -> Self {
        Self::with_unit(self.unit.clone())
    }

    pub fn indent_string(&self) -> String {
        self.unit.repeat(self.level)
    }

    /// Prefix every non-blank line with the indentation string.
    ///
    /// Blank lines come out empty and no separator is added after the last
    /// line. At level zero the text is returned untouched.
    pub fn indent(&self, text: &str) -> String {
        if self.level == 0 {
            return text.to_string();
        }

        let prefix = self.indent_string();
        text.split('\n')
            .map(|line| {
                if line.trim().is_empty() {
                    String::new()
                } else {
                    format!("{prefix}{line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for PrettyPrintContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefix every non-blank line after the first with `indentation`
pub(crate) fn align_continuation(text: &str, indentation: &str) -> String {
    if indentation.is_empty() || !text.contains('\n') {
        return text.to_string();
    }

    text.split('\n')
        .enumerate()
        .map(|(index, line)| {
            if index == 0 || line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{indentation}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

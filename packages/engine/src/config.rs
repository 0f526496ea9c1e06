use serde::{Deserialize, Serialize};

use crate::error::P2ppResult;

/// Pretty-print configuration, usually embedded in a binding's settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrettyPrintConfig {
    /// Text emitted per indentation level
    #[serde(default = "default_indent_unit")]
    pub indent_unit: String,

    /// Align continuation lines of text inserted into original source with
    /// the indentation of the owning node's first line
    #[serde(default = "default_align_insertions")]
    pub align_insertions: bool,
}

fn default_indent_unit() -> String {
    "\t".to_string()
}

fn default_align_insertions() -> bool {
    true
}

impl PrettyPrintConfig {
    pub fn from_json_str(json: &str) -> P2ppResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_indent_unit(mut self, unit: impl Into<String>) -> Self {
        self.indent_unit = unit.into();
        self
    }
}

impl Default for PrettyPrintConfig {
    fn default() -> Self {
        Self {
            indent_unit: default_indent_unit(),
            align_insertions: default_align_insertions(),
        }
    }
}

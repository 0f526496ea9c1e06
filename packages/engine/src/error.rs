//! Error types for the engine

use p2pp_rawsource::{ErrorKind, RawSourceFragment, SourceError};
use thiserror::Error;

use crate::NodeId;

pub type P2ppResult<T> = Result<T, P2ppError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum P2ppError {
    /// Position or fragment bookkeeping is inconsistent. Aborts the render.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// The binding has no node factory for a model object. Contained to the
    /// sub-tree that referenced the object.
    #[error("No node can be made for model object {0}")]
    MissingNode(String),

    #[error("Binding error: {0}")]
    Binding(String),

    #[error("Fragments {first} and {second} under node {node} overlap")]
    OverlappingFragments {
        node: NodeId,
        first: RawSourceFragment,
        second: RawSourceFragment,
    },

    #[error("Contents is not sequential")]
    NotSequential,

    #[error("Unknown node {0}")]
    UnknownNode(NodeId),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl P2ppError {
    /// Structural kind of the underlying source error, if any
    pub fn source_kind(&self) -> Option<ErrorKind> {
        match self {
            P2ppError::Source(err) => Some(err.kind()),
            _ => None,
        }
    }

    /// Errors that degrade a single sub-tree to empty output instead of
    /// aborting the whole render
    pub fn is_contained(&self) -> bool {
        matches!(self, P2ppError::MissingNode(_))
    }
}

impl From<serde_json::Error> for P2ppError {
    fn from(e: serde_json::Error) -> Self {
        P2ppError::InvalidConfig(e.to_string())
    }
}

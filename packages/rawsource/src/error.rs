use thiserror::Error;

use crate::{RawSourceFragment, RawSourcePosition};

pub type SourceResult<T> = Result<T, SourceError>;

/// Coarse classification of structural failures.
///
/// Every kind here indicates inconsistent position or fragment bookkeeping,
/// never bad user input, so callers abort the render that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PositionOutOfBounds,
    InvalidFragment,
    ConflictingEdit,
    FragmentOutsideBase,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Position {position} is outside the source ({lines} lines)")]
    PositionOutOfBounds {
        position: RawSourcePosition,
        lines: usize,
    },

    #[error("Cannot step {direction} from {position}: {reason}")]
    StepOutOfBounds {
        position: RawSourcePosition,
        direction: &'static str,
        reason: &'static str,
    },

    #[error("Invalid fragment: start {start} is after end {end}")]
    InvalidFragment {
        start: RawSourcePosition,
        end: RawSourcePosition,
    },

    #[error("Edit on {incoming} overlaps earlier edit on {existing}")]
    ConflictingEdit {
        existing: RawSourceFragment,
        incoming: RawSourceFragment,
    },

    #[error("Edit on {fragment} lies outside base fragment {base}")]
    FragmentOutsideBase {
        fragment: RawSourceFragment,
        base: RawSourceFragment,
    },
}

impl SourceError {
    pub fn out_of_bounds(position: RawSourcePosition, lines: usize) -> Self {
        Self::PositionOutOfBounds { position, lines }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::PositionOutOfBounds { .. } | SourceError::StepOutOfBounds { .. } => {
                ErrorKind::PositionOutOfBounds
            }
            SourceError::InvalidFragment { .. } => ErrorKind::InvalidFragment,
            SourceError::ConflictingEdit { .. } => ErrorKind::ConflictingEdit,
            SourceError::FragmentOutsideBase { .. } => ErrorKind::FragmentOutsideBase,
        }
    }
}

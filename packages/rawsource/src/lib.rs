//! Raw source text primitives for the p2pp round-trip engine
//!
//! This crate provides the immutable, line-indexed [`RawSource`], the
//! position and fragment arithmetic built on it, and [`DerivedRawSource`],
//! which folds positional edits over an original fragment to produce
//! re-serialized text (optionally with a source map back to the original).

pub mod builder;
pub mod derived;
pub mod error;
pub mod fragment;
pub mod position;
pub mod source;
pub mod utils;

pub use builder::SourceMapBuilder;
pub use derived::{DerivedRawSource, Edit, EditKind};
pub use error::{ErrorKind, SourceError, SourceResult};
pub use fragment::RawSourceFragment;
pub use position::RawSourcePosition;
pub use source::RawSource;
pub use utils::{byte_offset_to_position, fragment_from_byte_span, position_to_byte_offset};

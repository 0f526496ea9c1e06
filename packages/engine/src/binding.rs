//! # Language bindings
//!
//! The engine never parses anything itself. A language binding supplies:
//!
//! - a [`FragmentRetriever`] mapping parsed AST nodes to source spans,
//! - `build_model_object`, hydrating the model graph from the root AST node,
//! - `make_object_node`, describing how one model object serializes as an
//!   ordered list of [`Contents`].
//!
//! The binding instance itself is the context passed to these hooks, so a
//! binding needing shared parse state keeps it in its own fields.

use p2pp_rawsource::RawSourceFragment;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::contents::Contents;
use crate::error::P2ppResult;

/// Maps a parsed AST node to the span of source it was parsed from
pub trait FragmentRetriever<A> {
    fn retrieve_fragment(&self, ast: &A) -> P2ppResult<RawSourceFragment>;
}

/// Per-language hooks consumed by [`crate::P2ppTree`]
pub trait LanguageBinding {
    type Ast;

    /// Handle to a model object. Equality and hashing must follow object
    /// identity, since nodes are cached per object.
    type Object: Clone + Eq + Hash + fmt::Debug + 'static;

    fn fragment_retriever(&self) -> &dyn FragmentRetriever<Self::Ast>;

    /// Hydrate the model object (and everything below it) for an AST node
    fn build_model_object(&self, ast: &Self::Ast) -> Self::Object;

    /// Describe the node for a model object.
    ///
    /// Must be idempotent for the same object. `None` means the binding has
    /// no factory for this object.
    fn make_object_node(
        &self,
        object: &Self::Object,
    ) -> Option<NodeLayout<Self::Ast, Self::Object>>;
}

/// What a binding returns for one model object
pub struct NodeLayout<A, O> {
    /// AST node the object was parsed from; `None` for objects created after
    /// parsing
    pub ast: Option<A>,
    pub contents: Vec<Contents<O>>,
}

impl<A, O> NodeLayout<A, O> {
    pub fn parsed(ast: A, contents: Vec<Contents<O>>) -> Self {
        Self {
            ast: Some(ast),
            contents,
        }
    }

    pub fn synthetic(contents: Vec<Contents<O>>) -> Self {
        Self { ast: None, contents }
    }
}

/// Shared handle to a model object with identity semantics
///
/// Two handles are equal only when they point at the same object, which is
/// what node caching and list diffing need.
pub struct ModelRef<T>(Rc<RefCell<T>>);

impl<T> ModelRef<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Clone for ModelRef<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> PartialEq for ModelRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<T> Eq for ModelRef<T> {}

impl<T> Hash for ModelRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for ModelRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(value) => value.fmt(f),
            Err(_) => f.write_str("ModelRef(<borrowed>)"),
        }
    }
}

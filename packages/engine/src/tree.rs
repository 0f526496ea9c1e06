//! # Pretty-print tree
//!
//! Arena of [`P2ppNode`]s built lazily from the model graph. Nodes are
//! created once per model object per parent and referenced by [`NodeId`].
//!
//! ## Lifecycle
//!
//! ```text
//! deserialize → initialize_pretty_print → (mutate model → render)*
//!      ↓                  ↓                         ↓
//!  root node       parsed sub-tree +          incremental text
//!                  delimiter fragments
//! ```

use p2pp_rawsource::{RawSource, RawSourceFragment};
use serde::Serialize;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{instrument, trace};

use crate::binding::LanguageBinding;
use crate::config::PrettyPrintConfig;
use crate::contents::{Contents, Delimiter};
use crate::error::{P2ppError, P2ppResult};
use crate::node::{FragmentRole, MappedFragment, NodeId, P2ppNode};

/// Node tree for one source document and its model
pub struct P2ppTree<B: LanguageBinding> {
    pub(crate) binding: B,
    pub(crate) source: Rc<RawSource>,
    pub(crate) nodes: Vec<P2ppNode<B::Ast, B::Object>>,
    pub(crate) root: NodeId,
    pub(crate) config: PrettyPrintConfig,
    /// Literal and delimiter fragments discovered so far
    pub(crate) fragments: Vec<MappedFragment>,
    pub(crate) initialized: bool,
}

impl<B: LanguageBinding> P2ppTree<B> {
    /// Build the root node for `root_object` over `source` without running
    /// discovery
    pub fn new(binding: B, source: &str, root_object: B::Object) -> P2ppResult<Self> {
        let mut tree = Self {
            binding,
            source: Rc::new(RawSource::new(source)),
            nodes: Vec::new(),
            root: NodeId(0),
            config: PrettyPrintConfig::default(),
            fragments: Vec::new(),
            initialized: false,
        };
        tree.root = tree.make_node(None, root_object)?;
        Ok(tree)
    }

    /// Hydrate the model from the root AST node, build the tree and run
    /// delimiter discovery
    #[instrument(skip_all)]
    pub fn deserialize(binding: B, source: &str, root_ast: &B::Ast) -> P2ppResult<Self> {
        let root_object = binding.build_model_object(root_ast);
        let mut tree = Self::new(binding, source, root_object)?;
        tree.initialize_pretty_print()?;
        Ok(tree)
    }

    /// Tree for a model that has no source text. Every render is normalized.
    pub fn from_model(binding: B, root_object: B::Object) -> P2ppResult<Self> {
        Self::new(binding, "", root_object)
    }

    pub fn with_config(mut self, config: PrettyPrintConfig) -> Self {
        self.config = config;
        self
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn source(&self) -> &RawSource {
        &self.source
    }

    pub fn config(&self) -> &PrettyPrintConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> P2ppResult<&P2ppNode<B::Ast, B::Object>> {
        self.nodes.get(id.0).ok_or(P2ppError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> P2ppResult<&mut P2ppNode<B::Ast, B::Object>> {
        self.nodes.get_mut(id.0).ok_or(P2ppError::UnknownNode(id))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &P2ppNode<B::Ast, B::Object>)> {
        self.nodes.iter().enumerate().map(|(index, node)| (NodeId(index), node))
    }

    /// First node built for `object`, in creation order
    pub fn find_node(&self, object: &B::Object) -> Option<NodeId> {
        self.nodes().find(|(_, node)| node.object() == object).map(|(id, _)| id)
    }

    /// Contents of a node, for bindings that grow a sequence after parsing
    pub fn contents_mut(&mut self, id: NodeId) -> P2ppResult<&mut Vec<Contents<B::Object>>> {
        Ok(&mut self.node_mut(id)?.contents)
    }

    pub fn mapped_fragments(&self) -> &[MappedFragment] {
        &self.fragments
    }

    /// Look up the child node for `object`, building it through the binding
    /// when the parent has not seen the object yet
    pub fn get_object_node(&mut self, parent: NodeId, object: &B::Object) -> P2ppResult<NodeId> {
        if let Some(id) = self.node(parent)?.child_for(object) {
            return Ok(id);
        }
        self.make_node(Some(parent), object.clone())
    }

    fn make_node(&mut self, parent: Option<NodeId>, object: B::Object) -> P2ppResult<NodeId> {
        let layout = self
            .binding
            .make_object_node(&object)
            .ok_or_else(|| P2ppError::MissingNode(format!("{object:?}")))?;

        let parsed_fragment = match &layout.ast {
            Some(ast) => {
                let fragment = self.binding.fragment_retriever().retrieve_fragment(ast)?;
                self.source.validate_fragment(&fragment)?;
                Some(fragment)
            }
            None => None,
        };

        let id = NodeId(self.nodes.len());
        trace!(node = %id, ?parent, ?parsed_fragment, "creating node");

        self.nodes.push(P2ppNode::new(
            object.clone(),
            layout.ast,
            parent,
            parsed_fragment,
            layout.contents,
        ));

        if let Some(parent) = parent {
            let parent_node = self.node_mut(parent)?;
            parent_node.children.push(id);
            parent_node.child_index.insert(object, id);

            if let Some(fragment) = parsed_fragment {
                self.extend_span(parent, fragment)?;
            }
        }

        Ok(id)
    }

    /// Grow the span of `id` and of every ancestor to cover `fragment`
    pub(crate) fn extend_span(
        &mut self,
        id: NodeId,
        fragment: RawSourceFragment,
    ) -> P2ppResult<()> {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node_mut(id)?;
            if node.extend(fragment) {
                trace!(node = %id, %fragment, "span extended");
            }
            current = node.parent;
        }
        Ok(())
    }

    pub(crate) fn register_fragment(
        &mut self,
        owner: NodeId,
        role: FragmentRole,
        fragment: RawSourceFragment,
    ) -> P2ppResult<()> {
        self.source.validate_fragment(&fragment)?;
        self.fragments.push(MappedFragment { owner, role, fragment });
        self.extend_span(owner, fragment)
    }

    fn subtree(&self, id: NodeId) -> P2ppResult<Vec<NodeId>> {
        let mut stack = vec![id];
        let mut subtree = Vec::new();
        while let Some(id) = stack.pop() {
            stack.extend(self.node(id)?.children.iter().copied());
            subtree.push(id);
        }
        Ok(subtree)
    }

    /// Whether `fragment` overlaps text owned by `id` or a descendant: a
    /// parsed span, an item delimiter or a fragment their contents found
    pub fn is_fragment_mapped(&self, id: NodeId, fragment: &RawSourceFragment) -> P2ppResult<bool> {
        let subtree = self.subtree(id)?;
        for &member in &subtree {
            let node = self.node(member)?;
            let owned = [node.span, node.prelude.fragment(), node.postlude.fragment()];
            if owned.iter().flatten().any(|owned| owned.intersects(fragment)) {
                return Ok(true);
            }
        }

        let members: HashSet<NodeId> = subtree.into_iter().collect();
        Ok(self
            .fragments
            .iter()
            .any(|mapped| members.contains(&mapped.owner) && mapped.fragment.intersects(fragment)))
    }

    /// Whether a search window started from `searcher` would overlap text
    /// owned elsewhere. Spans of the searcher and its ancestors enclose the
    /// search and do not count.
    pub(crate) fn is_mapped_for_search(
        &self,
        searcher: NodeId,
        window: &RawSourceFragment,
    ) -> P2ppResult<bool> {
        let mut enclosing = HashSet::new();
        let mut current = Some(searcher);
        while let Some(id) = current {
            enclosing.insert(id);
            current = self.node(id)?.parent;
        }

        let foreign_span = self.nodes().any(|(id, node)| {
            !enclosing.contains(&id) && node.span.is_some_and(|span| span.intersects(window))
        });

        Ok(foreign_span || self.fragments.iter().any(|mapped| mapped.fragment.intersects(window)))
    }

    /// Verify that no two fragments under the same node intersect.
    ///
    /// The fragments under a node are the spans of its children plus every
    /// literal and delimiter its contents discovered.
    pub fn check_fragments(&self) -> P2ppResult<()> {
        for (id, node) in self.nodes() {
            let mut siblings: Vec<RawSourceFragment> = self
                .fragments
                .iter()
                .filter(|mapped| mapped.owner == id)
                .map(|mapped| mapped.fragment)
                .collect();

            for &child in &node.children {
                siblings.extend(self.node(child)?.span);
            }

            for (index, first) in siblings.iter().enumerate() {
                let overlapping = siblings[index + 1..]
                    .iter()
                    .find(|other| other.intersects(first));
                if let Some(second) = overlapping {
                    return Err(P2ppError::OverlappingFragments {
                        node: id,
                        first: *first,
                        second: *second,
                    });
                }
            }
        }
        Ok(())
    }

    /// Serializable dump of the node and fragment maps
    pub fn snapshot(&self) -> TreeSnapshot {
        let nodes = self
            .nodes()
            .map(|(id, node)| NodeSnapshot {
                id,
                parent: node.parent,
                object: format!("{:?}", node.object),
                synthetic: node.is_synthetic(),
                parsed_fragment: node.parsed_fragment,
                span: node.span,
                prelude: node.prelude.clone(),
                postlude: node.postlude.clone(),
                children: node.children.clone(),
                contents: node.contents.iter().map(|contents| contents.kind().name()).collect(),
            })
            .collect();

        TreeSnapshot {
            root: self.root,
            initialized: self.initialized,
            nodes,
            fragments: self.fragments.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    pub root: NodeId,
    pub initialized: bool,
    pub nodes: Vec<NodeSnapshot>,
    pub fragments: Vec<MappedFragment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub object: String,
    pub synthetic: bool,
    pub parsed_fragment: Option<RawSourceFragment>,
    pub span: Option<RawSourceFragment>,
    pub prelude: Delimiter,
    pub postlude: Delimiter,
    pub children: Vec<NodeId>,
    pub contents: Vec<&'static str>,
}

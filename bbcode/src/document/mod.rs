mod display;
mod element;

use std::sync::Arc;

use crate::definition::{TagDefinition, TagLookup};

pub use element::{Element, TagOptions};

/// Index of a node in its [`Document`].
///
/// Identifiers are assigned in creation order: the root is 0, the first
/// node created by a parse is 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node slot in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document root. Has no definition and no parent.
    Root { children: Vec<NodeId> },
    Element(Element),
    Text(String),
}

/// Receiver for the nodes a parse produces.
///
/// The tree builder tracks open elements itself and only asks the sink to
/// append. [`Document`] is the arena implementation; other sinks can build
/// their own node types from the same parse.
pub trait TreeSink {
    type Handle: Copy;

    fn root(&self) -> Self::Handle;

    /// Append literal text under `parent`, merging into a trailing text child.
    fn append_text(&mut self, parent: Self::Handle, text: &str);

    /// Append a new element under `parent` and return its handle.
    fn append_element(
        &mut self,
        parent: Self::Handle,
        definition: Arc<TagDefinition>,
        options: TagOptions,
    ) -> Self::Handle;
}

/// A parsed document: an arena of nodes owned by the root.
///
/// Nodes are never removed, so every [`NodeId`] handed out stays valid for
/// the lifetime of the document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the root.
    pub fn new() -> Self {
        Document {
            nodes: vec![Node {
                id: NodeId::ROOT,
                parent: None,
                kind: NodeKind::Root {
                    children: Vec::new(),
                },
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root has no children.
    pub fn is_empty(&self) -> bool {
        self.children(NodeId::ROOT).is_empty()
    }

    /// Panics if `id` does not belong to this document.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id)?.as_element()
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_text()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Ordered children of the root or an element; empty for text nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.get(id).map(|node| &node.kind) {
            Some(NodeKind::Root { children }) => children,
            Some(NodeKind::Element(element)) => &element.children,
            _ => &[],
        }
    }

    /// Nodes below `id` in document order, `id` itself excluded.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants {
            document: self,
            stack,
        }
    }

    /// Every element whose definition name is exactly `tag_name`, in
    /// pre-order. Elements carry the defined name, not the written one.
    pub fn elements_by_tag_name(&self, tag_name: &str) -> Vec<NodeId> {
        self.elements_where(|element| element.tag_name() == tag_name)
    }

    /// Like [`elements_by_tag_name`](Self::elements_by_tag_name) but names
    /// are compared with the lookup's case policy.
    pub fn elements_matching<L: TagLookup + ?Sized>(
        &self,
        tag_name: &str,
        lookup: &L,
    ) -> Vec<NodeId> {
        self.elements_where(|element| lookup.names_match(tag_name, element.tag_name()))
    }

    fn elements_where(&self, mut keep: impl FnMut(&Element) -> bool) -> Vec<NodeId> {
        self.descendants(NodeId::ROOT)
            .filter(|&id| self.element(id).is_some_and(&mut keep))
            .collect()
    }

    /// Concatenated literal text of the subtree at `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_owned();
        }
        self.descendants(id)
            .filter_map(|child| self.text(child))
            .collect()
    }

    fn next_id(&self) -> NodeId {
        NodeId(u32::try_from(self.nodes.len()).expect("document exceeds u32::MAX nodes"))
    }

    fn push_child(&mut self, parent: NodeId, child: NodeId) {
        match &mut self.nodes[parent.index()].kind {
            NodeKind::Root { children } => children.push(child),
            NodeKind::Element(element) => element.children.push(child),
            NodeKind::Text(_) => unreachable!("text nodes cannot have children"),
        }
    }
}

impl TreeSink for Document {
    type Handle = NodeId;

    fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    fn append_text(&mut self, parent: NodeId, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(&last) = self.children(parent).last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.index()].kind {
                existing.push_str(text);
                return;
            }
        }
        let id = self.next_id();
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            kind: NodeKind::Text(text.to_owned()),
        });
        self.push_child(parent, id);
    }

    fn append_element(
        &mut self,
        parent: NodeId,
        definition: Arc<TagDefinition>,
        options: TagOptions,
    ) -> NodeId {
        let id = self.next_id();
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            kind: NodeKind::Element(Element {
                definition,
                options,
                children: Vec::new(),
            }),
        });
        self.push_child(parent, id);
        id
    }
}

/// Pre-order iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.document.children(id).iter().rev().copied());
        Some(id)
    }
}

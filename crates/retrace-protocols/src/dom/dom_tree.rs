//! Document arena: construction, navigation and lookup.

use super::dom_node::{Element, ElementHandle, NodeId};
use super::markup::{self, MarkupError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    nodes: Vec<Element>,
    roots: Vec<NodeId>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a small HTML-like markup into a document.
    ///
    /// Text content is ignored; void elements (`input`, `br`, ...) and
    /// `<tag/>` need no closing tag.
    pub fn parse(input: &str) -> Result<Self, MarkupError> {
        markup::parse(input)
    }

    /// Appends an element; handles default to `index + 1`.
    pub fn append(
        &mut self,
        parent: Option<NodeId>,
        tag: &str,
        attributes: Vec<(String, String)>,
    ) -> NodeId {
        let handle = ElementHandle(self.nodes.len() as u64 + 1);
        self.append_with_handle(parent, tag, attributes, handle)
    }

    pub fn append_with_handle(
        &mut self,
        parent: Option<NodeId>,
        tag: &str,
        attributes: Vec<(String, String)>,
        handle: ElementHandle,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Element {
            tag: tag.to_ascii_lowercase(),
            attributes,
            handle,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.roots.first().copied()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Element for `id`. Ids are only valid for the document that issued them.
    pub fn element(&self, id: NodeId) -> &Element {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Element> {
        self.nodes.get(id.0)
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attr(name)
    }

    pub fn handle(&self, id: NodeId) -> ElementHandle {
        self.nodes[id.0].handle
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element siblings of `id`, including itself, in document order.
    pub fn siblings(&self, id: NodeId) -> &[NodeId] {
        match self.parent(id) {
            Some(p) => self.children(p),
            None => &self.roots,
        }
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |n| self.parent(*n))
    }

    /// `id` and all its descendants in document order.
    pub fn subtree(&self, id: NodeId) -> Subtree<'_> {
        Subtree {
            doc: self,
            stack: vec![id],
        }
    }

    /// Every element in document order.
    pub fn iter(&self) -> Subtree<'_> {
        Subtree {
            doc: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    pub fn find_by_handle(&self, handle: ElementHandle) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.handle == handle)
            .map(NodeId)
    }

    /// First element in document order whose `id` attribute equals `value`.
    pub fn get_element_by_id(&self, value: &str) -> Option<NodeId> {
        self.iter().find(|n| self.nodes[n.0].id() == Some(value))
    }

    /// Number of elements carrying `name="value"`.
    pub fn count_with_attr(&self, name: &str, value: &str) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.attr(name) == Some(value))
            .count()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.nodes.get_mut(id.0)?.remove_attr(name)
    }
}

/// Pre-order walk over part of a [`Document`].
pub struct Subtree<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Subtree<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

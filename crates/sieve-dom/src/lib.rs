//! Node tree and tree-access primitives for the sieve selector engine.
//!
//! This crate provides two things:
//! - the [`Adapter`] trait, which is all the selector engine knows about a
//!   tree: node identity, parent/children links, tag names, attributes and
//!   text;
//! - an arena-based [`DomTree`] following the
//!   [DOM Living Standard](https://dom.spec.whatwg.org/), which implements
//!   [`Adapter`] and is what the tests and most hosts query.
//!
//! # Design
//!
//! The tree uses arena allocation with [`NodeId`] indices for all relationships,
//! providing O(1) access and traversal without borrow checker issues. The
//! selector engine never creates or mutates nodes; it only hands node handles
//! back to the caller.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub mod traversal;

pub use traversal::{
    append_next_siblings, compare_document_position, document_root, find, remove_subsets,
    unique_sort,
};

/// Map of attribute names to values for an element.
pub type AttributesMap = HashMap<String, String>;

/// Read-only view of a tree of generic nodes.
///
/// Everything the selector engine needs from a document goes through this
/// trait. Node handles are small `Copy` values compared by identity.
pub trait Adapter {
    /// Handle to a node of the tree.
    type Node: Copy + Eq + Hash + Debug;

    /// Whether `node` is an element (as opposed to text, comments, or the
    /// document itself).
    fn is_tag(&self, node: Self::Node) -> bool;

    /// The parent of `node`, if it is attached.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// All children of `node`, in document order.
    fn children(&self, node: Self::Node) -> &[Self::Node];

    /// The local name of an element, `None` for other node kinds.
    fn name(&self, node: Self::Node) -> Option<&str>;

    /// The value of attribute `name` on an element.
    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// The character data of a text node, `None` for other node kinds.
    fn text(&self, node: Self::Node) -> Option<&str>;

    /// Whether an element carries attribute `name`.
    fn has_attribute(&self, node: Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// The node immediately before `node` under the same parent.
    fn prev_sibling(&self, node: Self::Node) -> Option<Self::Node> {
        let parent = self.parent(node)?;
        let children = self.children(parent);
        let index = children.iter().position(|&c| c == node)?;
        index.checked_sub(1).map(|i| children[i])
    }

    /// The node immediately after `node` under the same parent.
    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node> {
        let parent = self.parent(node)?;
        let children = self.children(parent);
        let index = children.iter().position(|&c| c == node)?;
        children.get(index + 1).copied()
    }

    /// The element children of `node`, in document order.
    fn element_children(&self, node: Self::Node) -> Vec<Self::Node> {
        self.children(node)
            .iter()
            .copied()
            .filter(|&c| self.is_tag(c))
            .collect()
    }

    /// [§ 4.4 textContent](https://dom.spec.whatwg.org/#dom-node-textcontent)
    ///
    /// "The descendant text content of a node is the concatenation of the data
    /// of all the Text node descendants of node, in tree order."
    fn text_content(&self, node: Self::Node) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(text) = self.text(current) {
                out.push_str(text);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }
}

/// A type-safe index into the DOM tree.
///
/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
/// "Each node has an associated node document..."
///
/// `NodeId` provides O(1) access to any node in the tree without borrowing issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// The root document node is always at index 0.
    pub const ROOT: Self = Self(0);
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Node is an abstract interface that is used by all nodes in a tree."
///
/// This node stores indices for parent/child/sibling relationships,
/// enabling O(1) traversal in any direction.
#[derive(Debug, Clone)]
pub struct Node {
    /// "Each node has an associated node type"
    pub node_type: NodeType,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-parent)
    /// "An object that participates in a tree has a parent, which is either
    /// null or an object."
    pub parent: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-child)
    /// "A node has an associated list of children"
    pub children: Vec<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-next-sibling)
    pub next_sibling: Option<NodeId>,

    /// [§ 4.4](https://dom.spec.whatwg.org/#concept-tree-previous-sibling)
    pub prev_sibling: Option<NodeId>,
}

/// [§ 4.4 Interface Node](https://dom.spec.whatwg.org/#interface-node)
///
/// "Each node has an associated node type"
#[derive(Debug, Clone)]
pub enum NodeType {
    /// [§ 4.5 Interface Document](https://dom.spec.whatwg.org/#interface-document)
    Document,
    /// [§ 4.9 Interface Element](https://dom.spec.whatwg.org/#interface-element)
    /// "Element nodes are simply known as elements."
    Element(ElementData),
    /// [§ 4.10 Interface Text](https://dom.spec.whatwg.org/#interface-text)
    Text(String),
    /// [§ 4.7 Interface Comment](https://dom.spec.whatwg.org/#interface-comment)
    Comment(String),
}

/// Element-specific data.
///
/// NOTE: We only store the local name and attributes. Namespaces are not
/// modelled; selectors compare names case-insensitively outside XML mode.
#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// "An element's local name"
    pub tag_name: String,
    /// "An element has an associated attribute list"
    pub attrs: AttributesMap,
}

impl ElementData {
    /// Returns the element's id attribute value if present.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.attrs.get("id").map(String::as_str)
    }
}

/// Arena-based DOM tree with O(1) node access and traversal.
///
/// [§ 4 Nodes](https://dom.spec.whatwg.org/#nodes)
///
/// "The DOM represents a document as a tree."
///
/// All nodes live in a contiguous vector and refer to each other by index.
/// The Document node is always at [`NodeId::ROOT`].
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new DOM tree with just the Document node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                node_type: NodeType::Document,
                parent: None,
                children: Vec::new(),
                next_sibling: None,
                prev_sibling: None,
            }],
        }
    }

    /// Get a node by its ID.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Allocate a detached node. Nothing links to it until it is appended.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            node_type,
            parent: None,
            children: Vec::new(),
            next_sibling: None,
            prev_sibling: None,
        });
        id
    }

    /// [§ 4.2.2 Append](https://dom.spec.whatwg.org/#concept-node-append)
    ///
    /// "To append a node to a parent, pre-insert node into parent before null."
    ///
    /// Appends `child` as the last child of `parent`, updating all relationships.
    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let prev_last_child = self.nodes[parent.0].children.last().copied();

        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);

        if let Some(prev_id) = prev_last_child {
            self.nodes[prev_id.0].next_sibling = Some(child);
            self.nodes[child.0].prev_sibling = Some(prev_id);
        }
    }

    /// Create an element and append it to `parent`.
    ///
    /// Attribute order is irrelevant; later duplicates overwrite earlier ones.
    pub fn create_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|&(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let id = self.alloc(NodeType::Element(ElementData {
            tag_name: tag.to_string(),
            attrs,
        }));
        self.append_child(parent, id);
        id
    }

    /// Create a text node and append it to `parent`.
    pub fn create_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeType::Text(text.to_string()));
        self.append_child(parent, id);
        id
    }

    /// Create a comment node and append it to `parent`.
    pub fn create_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(NodeType::Comment(text.to_string()));
        self.append_child(parent, id);
        id
    }

    /// Get element data if this node is an element.
    #[must_use]
    pub fn as_element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(|n| match &n.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        })
    }

    /// Find the first element (in tree order) whose id attribute is `id`.
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        let has_id = |n: NodeId| self.as_element(n).is_some_and(|e| e.id() == Some(id));
        find(self, has_id, &[NodeId::ROOT], true, Some(1))
            .first()
            .copied()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for DomTree {
    type Node = NodeId;

    fn is_tag(&self, node: NodeId) -> bool {
        self.as_element(node).is_some()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map_or(&[], |n| n.children.as_slice())
    }

    fn name(&self, node: NodeId) -> Option<&str> {
        self.as_element(node).map(|e| e.tag_name.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.as_element(node)
            .and_then(|e| e.attrs.get(name))
            .map(String::as_str)
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        self.get(node).and_then(|n| match &n.node_type {
            NodeType::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    // The arena keeps explicit sibling links, so skip the positional scan.
    fn prev_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.prev_sibling)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.next_sibling)
    }
}

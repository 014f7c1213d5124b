//! # Node Model
//!
//! The document is a tree of typed nodes. Each node carries its component
//! tag plus props, per-breakpoint style, action bindings and an optional
//! animation descriptor. Children are ordered; order is render order.
//!
//! Trees are treated as immutable values: every mutation in this crate
//! produces a *new* `Tree`, which is what makes snapshot history and
//! diffing safe.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Document format version, bumped on breaking model changes.
pub const BUILDER_VERSION: u32 = 1;

/// The fixed id of the document root. Exactly one node carries it.
pub const ROOT_ID: &str = "root";

/// Node identifier. Unique within a tree, immutable once assigned.
pub type NodeId = String;

/// Per-breakpoint style: breakpoint name (`base`, `mobile`, `tablet`, ...)
/// to CSS-like property map.
pub type StyleSheet = BTreeMap<String, BTreeMap<String, String>>;

/// An event → action binding (click → navigate, scrollTo, ...).
/// Opaque to the engine beyond being copied intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionBinding {
    pub event: String,
    pub action: Value,
}

/// Display metadata. Not semantically load-bearing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// One element of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,

    /// Component tag, resolved through the external registry.
    #[serde(rename = "type")]
    pub component: String,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub style: StyleSheet,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionBinding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<NodeMeta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Create an empty node of the given component with a fresh id.
    pub fn new(component: impl Into<String>) -> Self {
        Self::with_id(new_node_id(), component)
    }

    pub fn with_id(id: impl Into<NodeId>, component: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component: component.into(),
            props: Map::new(),
            style: StyleSheet::new(),
            actions: Vec::new(),
            animation: None,
            meta: None,
            children: Vec::new(),
        }
    }

    /// Total node count in this subtree (including self).
    pub fn subtree_size(&self) -> usize {
        1 + self.children.iter().map(Node::subtree_size).sum::<usize>()
    }
}

/// The full document: a root node plus a format version tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub builder_version: u32,
    pub root: Node,
}

impl Tree {
    /// Empty document: a bare root container.
    pub fn empty() -> Self {
        Self {
            builder_version: BUILDER_VERSION,
            root: Node::with_id(ROOT_ID, "root"),
        }
    }

    pub fn new(root: Node) -> Self {
        Self {
            builder_version: BUILDER_VERSION,
            root,
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::empty()
    }
}

/// Mint a fresh node id. Random v4, collision-free for practical purposes.
pub fn new_node_id() -> NodeId {
    uuid::Uuid::new_v4().to_string()
}

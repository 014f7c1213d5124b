//! # Tree Query/Transform Library
//!
//! Pure functions over tree snapshots. Every transform takes a borrowed
//! node and returns a fresh value; the input is never mutated. Lookups that
//! miss return `None` rather than failing — selection state may reference a
//! node a concurrent remote operation already deleted.

use crate::errors::EditError;
use crate::node::{new_node_id, Node, NodeId, Tree, ROOT_ID};
use crate::registry::ComponentRegistry;
use std::collections::HashSet;

/// Depth-first search for a node by id. Ids are unique, so the first match
/// is the only match.
pub fn find_node<'a>(root: &'a Node, id: &str) -> Option<&'a Node> {
    if root.id == id {
        return Some(root);
    }
    root.children.iter().find_map(|child| find_node(child, id))
}

/// Id of the immediate parent of `id`, or `None` for the root / a missing id.
pub fn find_parent_id<'a>(root: &'a Node, id: &str) -> Option<&'a str> {
    if root.children.iter().any(|child| child.id == id) {
        return Some(&root.id);
    }
    root.children
        .iter()
        .find_map(|child| find_parent_id(child, id))
}

/// Position of the direct child `id` within `parent.children`.
pub fn child_index(parent: &Node, id: &str) -> Option<usize> {
    parent.children.iter().position(|child| child.id == id)
}

/// Whether `id` names `root` itself or any descendant.
pub fn contains_id(root: &Node, id: &str) -> bool {
    find_node(root, id).is_some()
}

/// All ids in the subtree.
pub fn collect_ids(root: &Node) -> HashSet<NodeId> {
    let mut ids = HashSet::with_capacity(root.subtree_size());
    collect_into(root, &mut ids);
    ids
}

fn collect_into(node: &Node, ids: &mut HashSet<NodeId>) {
    ids.insert(node.id.clone());
    for child in &node.children {
        collect_into(child, ids);
    }
}

/// Deep copy of a subtree. With `regenerate_ids` every node in the copy
/// gets a fresh id while relative structure is preserved — required whenever
/// a subtree is duplicated or instantiated from a template, so the unique-id
/// invariant survives the insert.
pub fn clone_node(node: &Node, regenerate_ids: bool) -> Node {
    let mut copy = node.clone();
    if regenerate_ids {
        regenerate(&mut copy);
    }
    copy
}

fn regenerate(node: &mut Node) {
    node.id = new_node_id();
    for child in &mut node.children {
        regenerate(child);
    }
}

/// New tree with the node at `id` rewritten by `updater`. `None` when the
/// id is absent (callers no-op).
pub fn update_node(root: &Node, id: &str, updater: impl FnOnce(&mut Node)) -> Option<Node> {
    let mut next = root.clone();
    match find_node_mut(&mut next, id) {
        Some(target) => {
            updater(target);
            Some(next)
        }
        None => None,
    }
}

fn find_node_mut<'a>(root: &'a mut Node, id: &str) -> Option<&'a mut Node> {
    if root.id == id {
        return Some(root);
    }
    root.children
        .iter_mut()
        .find_map(|child| find_node_mut(child, id))
}

/// Result of excising a subtree: the new tree plus the removed subtree and
/// the position it was taken from (moves and drops need to re-insert it).
#[derive(Debug, Clone)]
pub struct Removal {
    pub root: Node,
    pub node: Node,
    pub parent_id: NodeId,
    pub index: usize,
}

/// New tree with the subtree at `id` excised from its parent's children.
/// `None` when `id` is the root or not present.
pub fn remove_node(root: &Node, id: &str) -> Option<Removal> {
    if root.id == id {
        return None;
    }
    let mut next = root.clone();
    splice_out(&mut next, id).map(|(node, parent_id, index)| Removal {
        root: next,
        node,
        parent_id,
        index,
    })
}

fn splice_out(node: &mut Node, id: &str) -> Option<(Node, NodeId, usize)> {
    if let Some(index) = child_index(node, id) {
        let removed = node.children.remove(index);
        return Some((removed, node.id.clone(), index));
    }
    node.children
        .iter_mut()
        .find_map(|child| splice_out(child, id))
}

/// New tree with `node` spliced into `parent_id`'s children at `index`
/// (clamped to `[0, len]`). Fails when the parent is missing or lives inside
/// the inserted subtree (which would create a cycle). Capability (whether the
/// parent's component may hold children) is the engine's concern; this layer
/// is purely structural.
pub fn insert_node_at(
    root: &Node,
    parent_id: &str,
    node: Node,
    index: usize,
) -> Result<Node, EditError> {
    if contains_id(&node, parent_id) {
        return Err(EditError::CycleDetected);
    }

    let mut next = root.clone();
    let parent = find_node_mut(&mut next, parent_id)
        .ok_or_else(|| EditError::ParentNotFound(parent_id.to_string()))?;

    let insert_index = index.min(parent.children.len());
    parent.children.insert(insert_index, node);
    Ok(next)
}

/// Check the structural invariants of a whole document: single well-known
/// root, unique ids, and no children under leaf components. Used by the
/// engine when adopting foreign trees and heavily by the test suite.
pub fn verify_integrity(tree: &Tree, registry: &dyn ComponentRegistry) -> Result<(), EditError> {
    if tree.root.id != ROOT_ID {
        return Err(EditError::InvalidTree(format!(
            "root node has id '{}', expected '{ROOT_ID}'",
            tree.root.id
        )));
    }

    let mut seen = HashSet::new();
    verify_node(&tree.root, registry, &mut seen)
}

fn verify_node(
    node: &Node,
    registry: &dyn ComponentRegistry,
    seen: &mut HashSet<NodeId>,
) -> Result<(), EditError> {
    if !seen.insert(node.id.clone()) {
        return Err(EditError::DuplicateId(node.id.clone()));
    }
    if !node.children.is_empty() && !registry.can_have_children(&node.component) {
        return Err(EditError::CannotHaveChildren(node.component.clone()));
    }
    for child in &node.children {
        verify_node(child, registry, seen)?;
    }
    Ok(())
}

//! # Mutation Engine
//!
//! `DocumentEngine` owns the canonical tree for one open document and is its
//! sole writer: every edit — local command, drop gesture, remote collaborator
//! operation — passes through this command surface, which validates against
//! the structural invariants before committing.
//!
//! ## Command semantics
//!
//! - Each structural command commits exactly one history entry.
//! - Field edits (props/style/actions/animation) commit one entry too, but
//!   rapid successive edits to the same field of the same node coalesce into
//!   a single entry so a live-dragged slider does not flood undo.
//! - Rejections are `Err` values; the tree is left untouched on any failure.
//! - Remote operations apply through [`DocumentEngine::apply_remote`], which
//!   runs the same validation but never records history: local undo never
//!   reverts a peer's edit.

use crate::errors::EditError;
use crate::history::History;
use crate::node::{ActionBinding, Node, NodeId, StyleSheet, Tree, ROOT_ID};
use crate::registry::ComponentRegistry;
use crate::tree;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Tuning knobs for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Maximum undo depth (0 = unlimited).
    pub max_undo_levels: usize,

    /// Field edits to the same (node, field) within this window share one
    /// history entry. Zero disables coalescing.
    pub coalesce_window: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_undo_levels: 100,
            coalesce_window: Duration::from_millis(400),
        }
    }
}

/// Outcome of [`DocumentEngine::replace_node_type`]. `dropped_children` is
/// non-zero when the new component is a leaf and existing children had to be
/// discarded — the UI should warn the user.
#[derive(Debug, Clone, PartialEq)]
pub struct RetypeOutcome {
    pub dropped_children: usize,
}

/// A collaborator's operation, received off the wire and applied through the
/// same validation path as local commands.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEdit {
    UpdateProps { node_id: NodeId, props: Map<String, Value> },
    UpdateStyle { node_id: NodeId, style: StyleSheet },
    DeleteNode { node_id: NodeId },
    ReplaceTree { tree: Tree },
}

/// Which field a field-edit command touched; the coalescing key.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Props,
    Style,
    Actions,
    Animation,
}

/// Stateful editing engine for one document. Construct one per open
/// document; there is no global instance.
pub struct DocumentEngine {
    tree: Tree,

    /// Increments on every applied mutation (local or remote).
    revision: u64,

    selected_node_id: Option<NodeId>,
    hovered_node_id: Option<NodeId>,

    registry: Arc<dyn ComponentRegistry>,
    history: History,

    coalesce_window: Duration,
    last_field_edit: Option<(NodeId, Field, Instant)>,
}

impl DocumentEngine {
    pub fn new(registry: Arc<dyn ComponentRegistry>) -> Self {
        Self::with_options(registry, EngineOptions::default())
    }

    pub fn with_options(registry: Arc<dyn ComponentRegistry>, options: EngineOptions) -> Self {
        Self {
            tree: Tree::empty(),
            revision: 0,
            selected_node_id: None,
            hovered_node_id: None,
            registry,
            history: History::with_max_levels(options.max_undo_levels),
            coalesce_window: options.coalesce_window,
            last_field_edit: None,
        }
    }

    // --- read surface (rendering layer re-reads after every commit) ---

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn selected_node_id(&self) -> Option<&str> {
        self.selected_node_id.as_deref()
    }

    pub fn hovered_node_id(&self) -> Option<&str> {
        self.hovered_node_id.as_deref()
    }

    pub fn registry(&self) -> &Arc<dyn ComponentRegistry> {
        &self.registry
    }

    // --- structural commands ---

    /// Create a node of `component` from its registry defaults and append it
    /// under `parent_id` (or the nearest ancestor that accepts children).
    /// Selects the new node.
    pub fn add_node(&mut self, parent_id: &str, component: &str) -> Result<NodeId, EditError> {
        self.add_node_at(parent_id, component, usize::MAX)
    }

    /// [`DocumentEngine::add_node`] with an explicit index (clamped). The
    /// drop-target resolver dispatches here with its resolved placement.
    pub fn add_node_at(
        &mut self,
        parent_id: &str,
        component: &str,
        index: usize,
    ) -> Result<NodeId, EditError> {
        let spec = self
            .registry
            .get(component)
            .ok_or_else(|| EditError::UnknownComponent(component.to_string()))?;

        let mut node = Node::new(component);
        node.props = spec.default_props.clone();
        node.style = spec.default_style.clone();
        let id = node.id.clone();

        let parent_id = self.resolve_child_capable(parent_id)?;
        let previous = self.tree.clone();
        self.tree.root = tree::insert_node_at(&self.tree.root, &parent_id, node, index)?;

        self.commit_structural(previous, "addNode");
        self.selected_node_id = Some(id.clone());
        Ok(id)
    }

    /// Insert a pre-built subtree (template/symbol instantiation) as the last
    /// child of `parent_id`. The subtree's ids must not collide with the
    /// document; callers clone templates with fresh ids first.
    pub fn insert_node_tree(&mut self, parent_id: &str, node: Node) -> Result<NodeId, EditError> {
        self.insert_node_tree_at(parent_id, node, usize::MAX)
    }

    pub fn insert_node_tree_at(
        &mut self,
        parent_id: &str,
        node: Node,
        index: usize,
    ) -> Result<NodeId, EditError> {
        let incoming = tree::collect_ids(&node);
        if incoming.len() != node.subtree_size() {
            return Err(EditError::InvalidTree(
                "inserted subtree repeats an id internally".to_string(),
            ));
        }
        let existing = tree::collect_ids(&self.tree.root);
        if let Some(clash) = incoming.into_iter().find(|id| existing.contains(id)) {
            warn!(id = %clash, "rejecting subtree insert: id already in document");
            return Err(EditError::DuplicateId(clash));
        }

        let id = node.id.clone();
        let parent_id = self.resolve_child_capable(parent_id)?;
        let previous = self.tree.clone();
        self.tree.root = tree::insert_node_at(&self.tree.root, &parent_id, node, index)?;

        self.commit_structural(previous, "insertNodeTree");
        self.selected_node_id = Some(id.clone());
        Ok(id)
    }

    /// Relocate `node_id` under `new_parent_id` at `index`. Rejects moves of
    /// the root and moves into the node's own subtree. A move that changes
    /// nothing is an `Ok` no-op with no history entry.
    pub fn move_node(
        &mut self,
        node_id: &str,
        new_parent_id: &str,
        index: usize,
    ) -> Result<(), EditError> {
        if node_id == ROOT_ID {
            return Err(EditError::RootImmutable);
        }
        let subject = tree::find_node(&self.tree.root, node_id)
            .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;
        if tree::contains_id(subject, new_parent_id) {
            warn!(node_id, new_parent_id, "rejecting move into own subtree");
            return Err(EditError::CycleDetected);
        }
        let parent = tree::find_node(&self.tree.root, new_parent_id)
            .ok_or_else(|| EditError::ParentNotFound(new_parent_id.to_string()))?;
        if !self.registry.can_have_children(&parent.component) {
            return Err(EditError::CannotHaveChildren(parent.component.clone()));
        }

        let removal = tree::remove_node(&self.tree.root, node_id)
            .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;
        let next = tree::insert_node_at(&removal.root, new_parent_id, removal.node, index)?;

        if next == self.tree.root {
            // Source and destination are identical.
            return Ok(());
        }

        let previous = self.tree.clone();
        self.tree.root = next;
        self.commit_structural(previous, "moveNode");
        Ok(())
    }

    /// Remove the subtree at `node_id`. Selection/hover ids living inside
    /// the deleted subtree are cleared.
    pub fn delete_node(&mut self, node_id: &str) -> Result<(), EditError> {
        if node_id == ROOT_ID {
            return Err(EditError::RootImmutable);
        }
        let removal = tree::remove_node(&self.tree.root, node_id)
            .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;

        self.clear_ui_ids_within(&removal.node);
        let previous = self.tree.clone();
        self.tree.root = removal.root;
        self.commit_structural(previous, "deleteNode");
        Ok(())
    }

    /// Clone the subtree at `node_id` with fresh ids and insert the copy as
    /// the next sibling of the original. Returns the copy's root id.
    pub fn duplicate_node(&mut self, node_id: &str) -> Result<NodeId, EditError> {
        if node_id == ROOT_ID {
            return Err(EditError::RootImmutable);
        }
        let original = tree::find_node(&self.tree.root, node_id)
            .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;
        let copy = tree::clone_node(original, true);
        let copy_id = copy.id.clone();

        let parent_id = tree::find_parent_id(&self.tree.root, node_id)
            .ok_or_else(|| EditError::NotFound(node_id.to_string()))?
            .to_string();
        let parent = tree::find_node(&self.tree.root, &parent_id)
            .ok_or_else(|| EditError::ParentNotFound(parent_id.clone()))?;
        let index = tree::child_index(parent, node_id)
            .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;

        let previous = self.tree.clone();
        self.tree.root = tree::insert_node_at(&self.tree.root, &parent_id, copy, index + 1)?;
        self.commit_structural(previous, "duplicateNode");
        self.selected_node_id = Some(copy_id.clone());
        Ok(copy_id)
    }

    /// Swap the component type of `node_id`, resetting props/style to the new
    /// type's defaults while keeping id, children, meta, actions and
    /// animation. When the new type cannot hold children, existing children
    /// are dropped and the outcome says how many — the UI should warn.
    pub fn replace_node_type(
        &mut self,
        node_id: &str,
        new_component: &str,
    ) -> Result<RetypeOutcome, EditError> {
        if node_id == ROOT_ID {
            return Err(EditError::RootImmutable);
        }
        let spec = self
            .registry
            .get(new_component)
            .ok_or_else(|| EditError::UnknownComponent(new_component.to_string()))?;

        let default_props = spec.default_props.clone();
        let default_style = spec.default_style.clone();
        let keeps_children = spec.can_have_children;

        let mut dropped: Vec<Node> = Vec::new();
        let next = tree::update_node(&self.tree.root, node_id, |node| {
            node.component = new_component.to_string();
            node.props = default_props;
            node.style = default_style;
            if !keeps_children {
                dropped = std::mem::take(&mut node.children);
            }
        })
        .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;

        let dropped_children = dropped.iter().map(Node::subtree_size).sum();
        for orphan in &dropped {
            self.clear_ui_ids_within(orphan);
        }

        let previous = self.tree.clone();
        self.tree.root = next;
        self.commit_structural(previous, "replaceNodeType");
        Ok(RetypeOutcome { dropped_children })
    }

    // --- field edits (coalescable) ---

    /// Shallow-merge `patch` into the node's props. A `null` value clears
    /// the key.
    pub fn update_node_props(
        &mut self,
        node_id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), EditError> {
        let next = tree::update_node(&self.tree.root, node_id, |node| {
            for (key, value) in patch {
                if value.is_null() {
                    node.props.remove(&key);
                } else {
                    node.props.insert(key, value);
                }
            }
        })
        .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;

        self.swap_and_commit_field(next, node_id, Field::Props, "updateProps");
        Ok(())
    }

    /// Merge style properties per breakpoint: each patched breakpoint's map
    /// is merged into the existing one, other breakpoints stay untouched.
    pub fn update_node_style(
        &mut self,
        node_id: &str,
        patch: StyleSheet,
    ) -> Result<(), EditError> {
        let next = tree::update_node(&self.tree.root, node_id, |node| {
            for (breakpoint, properties) in patch {
                node.style.entry(breakpoint).or_default().extend(properties);
            }
        })
        .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;

        self.swap_and_commit_field(next, node_id, Field::Style, "updateStyle");
        Ok(())
    }

    /// Replace the node's ordered action bindings.
    pub fn update_node_actions(
        &mut self,
        node_id: &str,
        actions: Vec<ActionBinding>,
    ) -> Result<(), EditError> {
        let next = tree::update_node(&self.tree.root, node_id, |node| {
            node.actions = actions;
        })
        .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;

        self.swap_and_commit_field(next, node_id, Field::Actions, "updateActions");
        Ok(())
    }

    /// Set or clear the node's animation descriptor.
    pub fn update_node_animation(
        &mut self,
        node_id: &str,
        animation: Option<Value>,
    ) -> Result<(), EditError> {
        let next = tree::update_node(&self.tree.root, node_id, |node| {
            node.animation = animation;
        })
        .ok_or_else(|| EditError::NotFound(node_id.to_string()))?;

        self.swap_and_commit_field(next, node_id, Field::Animation, "updateAnimation");
        Ok(())
    }

    // --- whole-document commands ---

    /// Load boundary: adopt `tree` as the document and clear all history and
    /// UI state. Not undoable.
    pub fn set_tree(&mut self, tree: Tree) -> Result<(), EditError> {
        tree::verify_integrity(&tree, self.registry.as_ref())?;
        self.tree = tree;
        self.history.clear();
        self.selected_node_id = None;
        self.hovered_node_id = None;
        self.last_field_edit = None;
        self.revision += 1;
        debug!(revision = self.revision, "document loaded");
        Ok(())
    }

    /// Undoable whole-document replacement (full-page template application).
    pub fn replace_tree(&mut self, tree: Tree) -> Result<(), EditError> {
        tree::verify_integrity(&tree, self.registry.as_ref())?;
        let previous = std::mem::replace(&mut self.tree, tree);
        self.commit_structural(previous, "replaceTree");
        self.prune_ui_ids();
        Ok(())
    }

    // --- UI state (never part of history) ---

    /// Select a node. Selecting an id that no longer exists clears the
    /// selection instead of failing.
    pub fn select_node(&mut self, id: Option<NodeId>) {
        self.selected_node_id = id.filter(|id| tree::contains_id(&self.tree.root, id));
    }

    pub fn hover_node(&mut self, id: Option<NodeId>) {
        self.hovered_node_id = id.filter(|id| tree::contains_id(&self.tree.root, id));
    }

    // --- history ---

    /// Restore the previous snapshot. Returns whether anything was undone.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.tree.clone()) {
            Some(previous) => {
                self.tree = previous;
                self.revision += 1;
                self.last_field_edit = None;
                self.prune_ui_ids();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.tree.clone()) {
            Some(next) => {
                self.tree = next;
                self.revision += 1;
                self.last_field_edit = None;
                self.prune_ui_ids();
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    // --- collaboration entry point ---

    /// Apply a collaborator's operation. Same validation as local commands,
    /// but never records a history entry: undo only ever reverts local edits.
    pub fn apply_remote(&mut self, edit: RemoteEdit) -> Result<(), EditError> {
        match edit {
            RemoteEdit::UpdateProps { node_id, props } => {
                let next = tree::update_node(&self.tree.root, &node_id, |node| {
                    for (key, value) in props {
                        if value.is_null() {
                            node.props.remove(&key);
                        } else {
                            node.props.insert(key, value);
                        }
                    }
                })
                .ok_or_else(|| EditError::NotFound(node_id))?;
                self.tree.root = next;
            }
            RemoteEdit::UpdateStyle { node_id, style } => {
                let next = tree::update_node(&self.tree.root, &node_id, |node| {
                    for (breakpoint, properties) in style {
                        node.style.entry(breakpoint).or_default().extend(properties);
                    }
                })
                .ok_or_else(|| EditError::NotFound(node_id))?;
                self.tree.root = next;
            }
            RemoteEdit::DeleteNode { node_id } => {
                if node_id == ROOT_ID {
                    return Err(EditError::RootImmutable);
                }
                let removal = tree::remove_node(&self.tree.root, &node_id)
                    .ok_or_else(|| EditError::NotFound(node_id))?;
                self.clear_ui_ids_within(&removal.node);
                self.tree.root = removal.root;
            }
            RemoteEdit::ReplaceTree { tree } => {
                tree::verify_integrity(&tree, self.registry.as_ref())?;
                self.tree = tree;
                self.prune_ui_ids();
            }
        }
        self.revision += 1;
        debug!(revision = self.revision, "applied remote edit");
        Ok(())
    }

    // --- internals ---

    /// Walk up from `parent_id` to the nearest node whose component accepts
    /// children. The root is a container, so the walk always terminates.
    fn resolve_child_capable(&self, parent_id: &str) -> Result<NodeId, EditError> {
        let mut current = tree::find_node(&self.tree.root, parent_id)
            .ok_or_else(|| EditError::ParentNotFound(parent_id.to_string()))?;

        loop {
            if self.registry.can_have_children(&current.component) {
                return Ok(current.id.clone());
            }
            match tree::find_parent_id(&self.tree.root, &current.id) {
                Some(ancestor_id) => {
                    current = tree::find_node(&self.tree.root, ancestor_id)
                        .ok_or_else(|| EditError::ParentNotFound(ancestor_id.to_string()))?;
                }
                None => {
                    return Err(EditError::CannotHaveChildren(current.component.clone()));
                }
            }
        }
    }

    fn commit_structural(&mut self, previous: Tree, label: &str) {
        self.history.commit(previous, label);
        self.last_field_edit = None;
        self.revision += 1;
        debug!(label, revision = self.revision, "committed mutation");
    }

    fn swap_and_commit_field(&mut self, next: Node, node_id: &str, field: Field, label: &str) {
        let builder_version = self.tree.builder_version;
        let previous = std::mem::replace(
            &mut self.tree,
            Tree {
                builder_version,
                root: next,
            },
        );

        let now = Instant::now();
        let coalesce = self.last_field_edit.as_ref().is_some_and(|(id, last_field, at)| {
            id.as_str() == node_id
                && *last_field == field
                && now.duration_since(*at) < self.coalesce_window
        });
        if !coalesce {
            self.history.commit(previous, label);
        }
        self.last_field_edit = Some((node_id.to_string(), field, now));
        self.revision += 1;
        debug!(label, revision = self.revision, coalesced = coalesce, "committed field edit");
    }

    fn clear_ui_ids_within(&mut self, removed: &Node) {
        if let Some(selected) = &self.selected_node_id {
            if tree::contains_id(removed, selected) {
                self.selected_node_id = None;
            }
        }
        if let Some(hovered) = &self.hovered_node_id {
            if tree::contains_id(removed, hovered) {
                self.hovered_node_id = None;
            }
        }
    }

    /// Drop selection/hover ids that no longer resolve (after undo/redo or
    /// whole-tree replacement).
    fn prune_ui_ids(&mut self) {
        if let Some(selected) = &self.selected_node_id {
            if !tree::contains_id(&self.tree.root, selected) {
                self.selected_node_id = None;
            }
        }
        if let Some(hovered) = &self.hovered_node_id {
            if !tree::contains_id(&self.tree.root, hovered) {
                self.hovered_node_id = None;
            }
        }
    }
}

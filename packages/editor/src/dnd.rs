//! # Drop-Target Resolution
//!
//! Converts a drag gesture into a well-formed tree edit. The gesture is a
//! small state machine (`Idle → Dragging → Idle`); resolution happens once,
//! at drop time, from the droppable directly under the pointer:
//!
//! - hovering a child-capable container drops *into* it, prepended;
//! - hovering a leaf drops as the sibling immediately after it;
//! - dropping an existing node into its own subtree is rejected.
//!
//! Hit-testing (which droppable is under the pointer) is the canvas layer's
//! job; the deepest registered droppable wins there, which is why capability
//! is resolved from the hovered id itself, never an ancestor.

use crate::engine::DocumentEngine;
use crate::errors::EditError;
use crate::node::{NodeId, Tree, ROOT_ID};
use crate::registry::ComponentRegistry;
use crate::tree;

/// What is being dragged: a palette component not yet in the document, or an
/// existing node picked up on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum DragPayload {
    NewComponent(String),
    ExistingNode(NodeId),
}

/// Ephemeral per-gesture state. Created on drag-start, updated on drag-over,
/// consumed on drop or cancel. Never persisted.
#[derive(Debug, Clone)]
pub struct DragSession {
    pub payload: DragPayload,
    pub pointer: (f64, f64),
    pub hovered_id: Option<NodeId>,
}

/// A legal insertion point.
#[derive(Debug, Clone, PartialEq)]
pub struct DropPlacement {
    pub parent_id: NodeId,
    pub index: usize,
}

/// How a finished gesture ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// A palette component was instantiated; id of the new node.
    Inserted(NodeId),
    /// An existing node was relocated.
    Moved,
    /// Drop landed on itself or inside its own subtree; no mutation.
    Rejected,
    /// Dropped outside any droppable (or the target vanished); no mutation.
    NoTarget,
}

/// Deterministic placement for a drop over `hovered_id`. `None` when the
/// hovered node no longer exists (e.g. deleted mid-drag by a collaborator).
pub fn resolve_drop_target(
    tree: &Tree,
    registry: &dyn ComponentRegistry,
    hovered_id: &str,
) -> Option<DropPlacement> {
    let hovered = tree::find_node(&tree.root, hovered_id)?;

    // Containers (and always the root) swallow the drop, prepended.
    if hovered.id == ROOT_ID || registry.can_have_children(&hovered.component) {
        return Some(DropPlacement {
            parent_id: hovered.id.clone(),
            index: 0,
        });
    }

    // Leaves resolve to "sibling immediately after".
    match tree::find_parent_id(&tree.root, hovered_id) {
        Some(parent_id) => {
            let parent = tree::find_node(&tree.root, parent_id)?;
            let index = tree::child_index(parent, hovered_id)? + 1;
            Some(DropPlacement {
                parent_id: parent_id.to_string(),
                index,
            })
        }
        // Unreachable for a consistent tree (only the root is parentless and
        // the root accepts children), kept as a safe fallback.
        None => Some(DropPlacement {
            parent_id: ROOT_ID.to_string(),
            index: tree.root.children.len(),
        }),
    }
}

/// Drag gesture state machine.
#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `Dragging`. A gesture already in flight is discarded.
    pub fn begin(&mut self, payload: DragPayload, pointer: (f64, f64)) {
        self.session = Some(DragSession {
            payload,
            pointer,
            hovered_id: None,
        });
    }

    /// Drag-over update: pointer position.
    pub fn update_pointer(&mut self, pointer: (f64, f64)) {
        if let Some(session) = &mut self.session {
            session.pointer = pointer;
        }
    }

    /// Drag-over update: the droppable currently under the pointer.
    pub fn hover(&mut self, hovered_id: Option<NodeId>) {
        if let Some(session) = &mut self.session {
            session.hovered_id = hovered_id;
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    /// Cancel the gesture (escape, pointer lost). No mutation.
    pub fn cancel(&mut self) {
        self.session = None;
    }

    /// Drag-end: resolve the placement and dispatch the edit. The session is
    /// consumed regardless of how the drop ends.
    pub fn drop_on(&mut self, engine: &mut DocumentEngine) -> Result<DropOutcome, EditError> {
        let session = match self.session.take() {
            Some(session) => session,
            None => return Ok(DropOutcome::NoTarget),
        };

        let hovered_id = match session.hovered_id {
            Some(id) => id,
            None => return Ok(DropOutcome::NoTarget),
        };

        let placement =
            match resolve_drop_target(engine.tree(), engine.registry().as_ref(), &hovered_id) {
                Some(placement) => placement,
                None => return Ok(DropOutcome::NoTarget),
            };

        match session.payload {
            DragPayload::NewComponent(component) => {
                let id = engine.add_node_at(&placement.parent_id, &component, placement.index)?;
                Ok(DropOutcome::Inserted(id))
            }
            DragPayload::ExistingNode(node_id) => {
                // Cycle guard: resolved parent inside the dragged subtree.
                if let Some(subtree) = tree::find_node(&engine.tree().root, &node_id) {
                    if tree::contains_id(subtree, &placement.parent_id) {
                        return Ok(DropOutcome::Rejected);
                    }
                }
                engine.move_node(&node_id, &placement.parent_id, placement.index)?;
                Ok(DropOutcome::Moved)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StaticRegistry;
    use std::sync::Arc;

    fn engine_with_stack() -> (DocumentEngine, NodeId, NodeId, NodeId) {
        let mut engine = DocumentEngine::new(Arc::new(StaticRegistry::standard()));
        let stack = engine.add_node(ROOT_ID, "stack").unwrap();
        let t1 = engine.add_node(&stack, "text").unwrap();
        let t2 = engine.add_node(&stack, "text").unwrap();
        (engine, stack, t1, t2)
    }

    #[test]
    fn test_container_resolves_to_prepend() {
        let (engine, stack, _, _) = engine_with_stack();
        let registry = StaticRegistry::standard();

        let placement = resolve_drop_target(engine.tree(), &registry, &stack).unwrap();
        assert_eq!(placement, DropPlacement { parent_id: stack, index: 0 });
    }

    #[test]
    fn test_leaf_resolves_to_sibling_after() {
        let (engine, stack, _, t2) = engine_with_stack();
        let registry = StaticRegistry::standard();

        // Second child of the stack → index 2 in the stack.
        let placement = resolve_drop_target(engine.tree(), &registry, &t2).unwrap();
        assert_eq!(placement, DropPlacement { parent_id: stack, index: 2 });
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let (engine, _, t1, _) = engine_with_stack();
        let registry = StaticRegistry::standard();

        let first = resolve_drop_target(engine.tree(), &registry, &t1);
        let second = resolve_drop_target(engine.tree(), &registry, &t1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_hover_target_resolves_to_none() {
        let (engine, _, _, _) = engine_with_stack();
        let registry = StaticRegistry::standard();
        assert!(resolve_drop_target(engine.tree(), &registry, "ghost").is_none());
    }

    #[test]
    fn test_new_component_drop_into_container() {
        let (mut engine, stack, _, _) = engine_with_stack();

        let mut drag = DragController::new();
        drag.begin(DragPayload::NewComponent("button".to_string()), (10.0, 10.0));
        drag.hover(Some(stack.clone()));

        let outcome = drag.drop_on(&mut engine).unwrap();
        let id = match outcome {
            DropOutcome::Inserted(id) => id,
            other => panic!("expected insert, got {other:?}"),
        };

        let stack_node = tree::find_node(&engine.tree().root, &stack).unwrap();
        assert_eq!(stack_node.children[0].id, id);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_existing_node_drop_after_leaf() {
        let (mut engine, stack, t1, t2) = engine_with_stack();

        let mut drag = DragController::new();
        drag.begin(DragPayload::ExistingNode(t1.clone()), (0.0, 0.0));
        drag.update_pointer((50.0, 80.0));
        drag.hover(Some(t2.clone()));

        assert_eq!(drag.drop_on(&mut engine).unwrap(), DropOutcome::Moved);
        let stack_node = tree::find_node(&engine.tree().root, &stack).unwrap();
        assert_eq!(stack_node.children[0].id, t2);
        assert_eq!(stack_node.children[1].id, t1);
    }

    #[test]
    fn test_drop_into_own_subtree_rejected() {
        let mut engine = DocumentEngine::new(Arc::new(StaticRegistry::standard()));
        let outer = engine.add_node(ROOT_ID, "stack").unwrap();
        let inner = engine.add_node(&outer, "card").unwrap();
        let before = engine.tree().clone();

        let mut drag = DragController::new();
        drag.begin(DragPayload::ExistingNode(outer), (0.0, 0.0));
        drag.hover(Some(inner));

        assert_eq!(drag.drop_on(&mut engine).unwrap(), DropOutcome::Rejected);
        assert_eq!(engine.tree(), &before);
    }

    #[test]
    fn test_drop_outside_any_target() {
        let (mut engine, _, _, _) = engine_with_stack();
        let before = engine.tree().clone();

        let mut drag = DragController::new();
        drag.begin(DragPayload::NewComponent("button".to_string()), (0.0, 0.0));
        // never hovered anything droppable

        assert_eq!(drag.drop_on(&mut engine).unwrap(), DropOutcome::NoTarget);
        assert_eq!(engine.tree(), &before);
    }

    #[test]
    fn test_cancel_discards_session() {
        let (mut engine, stack, _, _) = engine_with_stack();
        let before = engine.tree().clone();

        let mut drag = DragController::new();
        drag.begin(DragPayload::NewComponent("button".to_string()), (0.0, 0.0));
        drag.hover(Some(stack));
        drag.cancel();

        assert!(!drag.is_dragging());
        assert_eq!(drag.drop_on(&mut engine).unwrap(), DropOutcome::NoTarget);
        assert_eq!(engine.tree(), &before);
    }
}

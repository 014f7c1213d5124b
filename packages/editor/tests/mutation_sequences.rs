//! Complex mutation sequence tests:
//! - undo/redo round trips over whole command sequences
//! - structural invariants after every step
//! - interleaving of remote edits with local history

use pagecraft_editor::{
    tree, DocumentEngine, EditError, EngineOptions, Node, RemoteEdit, StaticRegistry, Tree,
    ROOT_ID,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

fn engine() -> DocumentEngine {
    DocumentEngine::with_options(
        Arc::new(StaticRegistry::standard()),
        EngineOptions {
            coalesce_window: Duration::ZERO,
            ..EngineOptions::default()
        },
    )
}

fn label_patch(value: &str) -> Map<String, Value> {
    let mut patch = Map::new();
    patch.insert("label".to_string(), Value::String(value.to_string()));
    patch
}

#[test]
fn test_undo_redo_round_trip_over_full_sequence() {
    let mut engine = engine();
    let initial = engine.tree().clone();

    // A realistic editing sequence: build a section, rearrange, restyle.
    let section = engine.add_node(ROOT_ID, "section").unwrap();
    let stack = engine.add_node(&section, "stack").unwrap();
    let b1 = engine.add_node(&stack, "button").unwrap();
    let b2 = engine.add_node(&stack, "button").unwrap();
    engine.update_node_props(&b1, label_patch("Buy")).unwrap();
    engine.move_node(&b2, &section, 0).unwrap();
    engine.duplicate_node(&b1).unwrap();
    engine.delete_node(&b2).unwrap();

    let final_state = engine.tree().clone();
    let depth = engine.history().undo_levels();
    assert_eq!(depth, 8);

    // Undo everything: exactly back to the pristine document.
    for _ in 0..depth {
        assert!(engine.undo());
    }
    assert!(!engine.can_undo());
    assert_eq!(engine.tree(), &initial);

    // Redo everything: exactly back to the final state.
    for _ in 0..depth {
        assert!(engine.redo());
    }
    assert!(!engine.can_redo());
    assert_eq!(engine.tree(), &final_state);
}

#[test]
fn test_invariants_hold_after_every_command() {
    let registry = StaticRegistry::standard();
    let mut engine = engine();

    let section = engine.add_node(ROOT_ID, "section").unwrap();
    tree::verify_integrity(engine.tree(), &registry).unwrap();

    let stack = engine.add_node(&section, "stack").unwrap();
    tree::verify_integrity(engine.tree(), &registry).unwrap();

    let button = engine.add_node(&stack, "button").unwrap();
    tree::verify_integrity(engine.tree(), &registry).unwrap();

    engine.duplicate_node(&stack).unwrap();
    tree::verify_integrity(engine.tree(), &registry).unwrap();

    engine.move_node(&button, &section, 0).unwrap();
    tree::verify_integrity(engine.tree(), &registry).unwrap();

    engine.replace_node_type(&stack, "text").unwrap();
    tree::verify_integrity(engine.tree(), &registry).unwrap();

    engine.delete_node(&section).unwrap();
    tree::verify_integrity(engine.tree(), &registry).unwrap();

    assert!(engine.undo());
    tree::verify_integrity(engine.tree(), &registry).unwrap();
    assert!(engine.redo());
    tree::verify_integrity(engine.tree(), &registry).unwrap();
}

#[test]
fn test_move_within_parent_and_undo() {
    // root { stack s1 [b1, b2] }: move b1 to (s1, 2),
    // children become [b2, b1]; undo restores [b1, b2].
    let mut engine = engine();

    let mut s1 = Node::with_id("s1", "stack");
    s1.children.push(Node::with_id("b1", "button"));
    s1.children.push(Node::with_id("b2", "button"));
    let mut root = Node::with_id(ROOT_ID, "root");
    root.children.push(s1);
    engine.set_tree(Tree::new(root)).unwrap();

    engine.move_node("b1", "s1", 2).unwrap();
    let stack = tree::find_node(&engine.tree().root, "s1").unwrap();
    let order: Vec<&str> = stack.children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(order, vec!["b2", "b1"]);

    assert!(engine.undo());
    let stack = tree::find_node(&engine.tree().root, "s1").unwrap();
    let order: Vec<&str> = stack.children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(order, vec!["b1", "b2"]);
}

#[test]
fn test_cycle_guard_leaves_tree_byte_identical() {
    let mut engine = engine();
    let a = engine.add_node(ROOT_ID, "stack").unwrap();
    let b = engine.add_node(&a, "card").unwrap();
    let c = engine.add_node(&b, "stack").unwrap();

    let before = serde_json::to_string(engine.tree()).unwrap();

    assert_eq!(engine.move_node(&a, &c, 0), Err(EditError::CycleDetected));
    assert_eq!(engine.move_node(&a, &a, 0), Err(EditError::CycleDetected));

    let after = serde_json::to_string(engine.tree()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_duplicate_isolation() {
    let mut engine = engine();
    let stack = engine.add_node(ROOT_ID, "stack").unwrap();
    engine.add_node(&stack, "button").unwrap();
    engine.add_node(&stack, "text").unwrap();

    let ids_before = tree::collect_ids(&engine.tree().root);
    let copy = engine.duplicate_node(&stack).unwrap();

    let copy_node = tree::find_node(&engine.tree().root, &copy).unwrap();
    let copy_ids = tree::collect_ids(copy_node);

    // No id shared with the original subtree or anything else pre-existing.
    assert!(ids_before.is_disjoint(&copy_ids));
    assert_eq!(copy_ids.len(), 3);

    let registry = StaticRegistry::standard();
    tree::verify_integrity(engine.tree(), &registry).unwrap();
}

#[test]
fn test_remote_change_leaves_local_undo_entries_intact() {
    let mut engine = engine();
    let b1 = engine.add_node(ROOT_ID, "button").unwrap();
    engine.update_node_props(&b1, label_patch("local")).unwrap();

    let entries_before: Vec<Tree> = engine
        .history()
        .undo_entries()
        .iter()
        .map(|entry| entry.tree.clone())
        .collect();

    let mut remote_props = Map::new();
    remote_props.insert("text".to_string(), Value::String("Hi".to_string()));
    engine
        .apply_remote(RemoteEdit::UpdateProps {
            node_id: b1.clone(),
            props: remote_props,
        })
        .unwrap();

    // The remote edit landed...
    let node = tree::find_node(&engine.tree().root, &b1).unwrap();
    assert_eq!(node.props.get("text"), Some(&Value::String("Hi".into())));

    // ...but recorded history for prior local commands is untouched,
    // and no entry was added for the remote operation.
    let entries_after: Vec<Tree> = engine
        .history()
        .undo_entries()
        .iter()
        .map(|entry| entry.tree.clone())
        .collect();
    assert_eq!(entries_before, entries_after);
}

#[test]
fn test_remote_delete_clears_local_selection() {
    let mut engine = engine();
    let stack = engine.add_node(ROOT_ID, "stack").unwrap();
    let button = engine.add_node(&stack, "button").unwrap();
    engine.select_node(Some(button));

    engine
        .apply_remote(RemoteEdit::DeleteNode { node_id: stack })
        .unwrap();
    assert_eq!(engine.selected_node_id(), None);
}

#[test]
fn test_edit_after_undo_clears_redo_branch() {
    let mut engine = engine();
    let id = engine.add_node(ROOT_ID, "button").unwrap();
    engine.update_node_props(&id, label_patch("one")).unwrap();
    engine.update_node_props(&id, label_patch("two")).unwrap();

    engine.undo();
    engine.undo();
    assert_eq!(engine.history().redo_levels(), 2);

    engine.update_node_props(&id, label_patch("branch")).unwrap();
    assert_eq!(engine.history().redo_levels(), 0);
    assert!(!engine.redo());

    let node = tree::find_node(&engine.tree().root, &id).unwrap();
    assert_eq!(node.props.get("label"), Some(&Value::String("branch".into())));
}

#[test]
fn test_operations_on_vanished_nodes_are_benign() {
    let mut engine = engine();
    let id = engine.add_node(ROOT_ID, "button").unwrap();
    engine.delete_node(&id).unwrap();

    let err = engine.update_node_props(&id, label_patch("late")).unwrap_err();
    assert!(err.is_benign());
    let err = engine.delete_node(&id).unwrap_err();
    assert!(err.is_benign());
    let err = engine.move_node(&id, ROOT_ID, 0).unwrap_err();
    assert!(err.is_benign());
}

#[test]
fn test_template_insertion_round_trip() -> anyhow::Result<()> {
    let mut engine = engine();

    // A "symbol": card with a text and a button, cloned with fresh ids
    // before every instantiation.
    let mut template = Node::with_id("tpl-card", "card");
    template.children.push(Node::with_id("tpl-text", "text"));
    template.children.push(Node::with_id("tpl-btn", "button"));

    let first = engine.insert_node_tree(ROOT_ID, tree::clone_node(&template, true))?;
    let second = engine.insert_node_tree(ROOT_ID, tree::clone_node(&template, true))?;
    assert_ne!(first, second);

    let registry = StaticRegistry::standard();
    tree::verify_integrity(engine.tree(), &registry)?;
    assert_eq!(engine.tree().root.children.len(), 2);

    engine.undo();
    assert_eq!(engine.tree().root.children.len(), 1);
    engine.undo();
    assert!(engine.tree().root.children.is_empty());
    Ok(())
}

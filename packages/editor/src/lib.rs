//! # Pagecraft Editor
//!
//! Document model and mutation engine for the Pagecraft page builder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ canvas UI (external): click / drag events   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ dnd: pointer gesture → (parent, index)      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ engine: validated commands over the tree    │
//! │  - insert / move / delete / clone / edit    │
//! │  - snapshot history (undo/redo)             │
//! │  - remote-edit entry point for collab       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ tree: pure query/transform over snapshots   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core principles
//!
//! 1. **Trees are values**: every mutation produces a new snapshot; nothing
//!    previously handed out is ever mutated in place.
//! 2. **One writer**: all edits — local, drag-and-drop, remote — go through
//!    [`DocumentEngine`]; invariants are checked there, once.
//! 3. **Rejection, not panic**: structural violations and vanished targets
//!    are `Err` values the UI can shrug off.
//! 4. **Component behavior is external**: capabilities and defaults resolve
//!    through [`ComponentRegistry`], never inline branching on type tags.
//!
//! ## Usage
//!
//! ```rust
//! use pagecraft_editor::{DocumentEngine, StaticRegistry, ROOT_ID};
//! use std::sync::Arc;
//!
//! let mut engine = DocumentEngine::new(Arc::new(StaticRegistry::standard()));
//!
//! let section = engine.add_node(ROOT_ID, "section").unwrap();
//! let button = engine.add_node(&section, "button").unwrap();
//!
//! engine.delete_node(&button).unwrap();
//! engine.undo();
//! assert!(engine.can_redo());
//! ```

mod dnd;
mod engine;
mod errors;
mod history;
mod node;
mod registry;
pub mod tree;

pub use dnd::{
    resolve_drop_target, DragController, DragPayload, DragSession, DropOutcome, DropPlacement,
};
pub use engine::{DocumentEngine, EngineOptions, RemoteEdit, RetypeOutcome};
pub use errors::EditError;
pub use history::{History, HistoryEntry};
pub use node::{
    new_node_id, ActionBinding, Node, NodeId, NodeMeta, StyleSheet, Tree, BUILDER_VERSION, ROOT_ID,
};
pub use registry::{ComponentRegistry, ComponentSpec, StaticRegistry};

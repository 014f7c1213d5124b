//! Error types for the editor.
//!
//! Predictable structural conditions are reported as `Err` values, never
//! panics: a bad drag must not be able to crash the editor. `NotFound` in
//! particular is benign — a remote peer may have deleted the target while a
//! local command was in flight, and callers simply skip the edit.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Node not found: {0}")]
    NotFound(String),

    #[error("Parent not found: {0}")]
    ParentNotFound(String),

    #[error("Would create cycle")]
    CycleDetected,

    #[error("Component '{0}' cannot have children")]
    CannotHaveChildren(String),

    #[error("Unknown component type: {0}")]
    UnknownComponent(String),

    #[error("The document root cannot be moved, deleted, duplicated or retyped")]
    RootImmutable,

    #[error("Duplicate node id: {0}")]
    DuplicateId(String),

    #[error("Invalid tree: {0}")]
    InvalidTree(String),
}

impl EditError {
    /// Whether this failure should be treated as a silent no-op by UI code
    /// (target vanished, e.g. deleted by a concurrent remote operation).
    pub fn is_benign(&self) -> bool {
        matches!(self, EditError::NotFound(_) | EditError::ParentNotFound(_))
    }
}

//! # Pagecraft Collab
//!
//! Realtime collaboration relay for Pagecraft documents: a thin
//! synchronization layer that fans presence, cursors and document change
//! operations out between peers editing the same page.
//!
//! ## Model
//!
//! - One [`DocumentChannel`] per open document, wrapping the shared
//!   [`pagecraft_editor::DocumentEngine`].
//! - Change operations apply through the engine's remote entry point — the
//!   relay never bypasses invariants, and remote edits never enter the
//!   local undo stack.
//! - Consistency is last-writer-wins at the operation level, not a CRDT:
//!   concurrent edits to the same field resolve by arrival order.
//! - Presence and cursors are display-only and never mutate the document.
//!
//! The wire format is JSON frames tagged by `"type"`
//! (join/presence/cursor/change/leave); transport is out of scope.

mod protocol;
mod relay;

pub use protocol::{
    decode_message, encode_message, ChangeOperation, PeerInfo, WireMessage,
};
pub use relay::DocumentChannel;

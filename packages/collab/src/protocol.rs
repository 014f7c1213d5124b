//! Wire protocol for the collaboration channel.
//!
//! Messages are JSON, discriminated by a `"type"` field. The transport is
//! someone else's problem; this module only defines the shapes and a
//! tolerant decoder. Unknown or malformed messages are dropped with a
//! warn-level trace — a bad peer must never take down the editor.

use pagecraft_editor::{NodeId, RemoteEdit, StyleSheet, Tree};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// A connected peer as shown to other peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub user_id: String,
    pub user_name: String,
    pub color: String,
}

/// A document operation carried by a `change` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChangeOperation {
    #[serde(rename_all = "camelCase")]
    UpdateProps {
        node_id: NodeId,
        props: Map<String, Value>,
    },
    #[serde(rename_all = "camelCase")]
    UpdateStyle { node_id: NodeId, style: StyleSheet },
    #[serde(rename_all = "camelCase")]
    DeleteNode { node_id: NodeId },
    ReplaceTree { tree: Tree },
}

impl From<ChangeOperation> for RemoteEdit {
    fn from(op: ChangeOperation) -> Self {
        match op {
            ChangeOperation::UpdateProps { node_id, props } => {
                RemoteEdit::UpdateProps { node_id, props }
            }
            ChangeOperation::UpdateStyle { node_id, style } => {
                RemoteEdit::UpdateStyle { node_id, style }
            }
            ChangeOperation::DeleteNode { node_id } => RemoteEdit::DeleteNode { node_id },
            ChangeOperation::ReplaceTree { tree } => RemoteEdit::ReplaceTree { tree },
        }
    }
}

/// Everything that travels over a document channel, both directions.
/// `presence` is only ever produced by the relay; the rest originate from
/// peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireMessage {
    #[serde(rename_all = "camelCase")]
    Join {
        page_id: String,
        user_id: String,
        user_name: String,
    },
    Presence {
        users: Vec<PeerInfo>,
    },
    #[serde(rename_all = "camelCase")]
    Cursor {
        user_id: String,
        user_name: String,
        color: String,
        x: f64,
        y: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selected_node_id: Option<NodeId>,
    },
    Change {
        operation: ChangeOperation,
    },
    #[serde(rename_all = "camelCase")]
    Leave {
        page_id: String,
    },
}

/// Decode one inbound frame. Malformed input yields `None`, never an error.
pub fn decode_message(raw: &str) -> Option<WireMessage> {
    match serde_json::from_str(raw) {
        Ok(message) => Some(message),
        Err(error) => {
            warn!(%error, "dropping malformed collab message");
            None
        }
    }
}

pub fn encode_message(message: &WireMessage) -> String {
    // WireMessage contains no non-string map keys, so serialization cannot
    // fail; an empty frame is dropped by peers anyway.
    serde_json::to_string(message).unwrap_or_default()
}

//! # Collaboration Relay
//!
//! One `DocumentChannel` per open document. Peers connect, receive the
//! current presence roster, and exchange cursor and change messages. Change
//! operations are applied through the shared [`DocumentEngine`] — the same
//! validated entry points a local command uses — and only re-broadcast when
//! the engine accepted them.
//!
//! Ordering is last-writer-wins per operation: whichever change is applied
//! later wins, network timing decides. No vector clocks, no merge.
//! Disconnects tear down presence only; applied document mutations are
//! never rolled back.

use crate::protocol::{
    decode_message, ChangeOperation, PeerInfo, WireMessage,
};
use pagecraft_editor::DocumentEngine;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, warn};

/// Cursor colors handed out in join order.
const PEER_COLORS: [&str; 8] = [
    "#e5484d", "#f76b15", "#ffc53d", "#30a46c", "#00b4d8", "#3e63dd", "#8e4ec6", "#e93d82",
];

struct Peer {
    info: PeerInfo,
    tx: mpsc::Sender<WireMessage>,
}

/// The relay hub for one document.
pub struct DocumentChannel {
    page_id: String,
    engine: Arc<Mutex<DocumentEngine>>,
    peers: Arc<RwLock<HashMap<String, Peer>>>,
}

impl DocumentChannel {
    pub fn new(page_id: impl Into<String>, engine: Arc<Mutex<DocumentEngine>>) -> Self {
        Self {
            page_id: page_id.into(),
            engine,
            peers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn engine(&self) -> &Arc<Mutex<DocumentEngine>> {
        &self.engine
    }

    /// Register a peer and hand back its message stream. The first message
    /// every peer receives is the presence roster including itself.
    pub async fn connect(&self, user_id: &str, user_name: &str) -> mpsc::Receiver<WireMessage> {
        let (tx, rx) = mpsc::channel(100);

        {
            let mut peers = self.peers.write().await;
            let color = PEER_COLORS[peers.len() % PEER_COLORS.len()].to_string();
            peers.insert(
                user_id.to_string(),
                Peer {
                    info: PeerInfo {
                        user_id: user_id.to_string(),
                        user_name: user_name.to_string(),
                        color,
                    },
                    tx,
                },
            );
        }

        debug!(page_id = %self.page_id, user_id, "peer connected");
        self.broadcast_presence().await;
        rx
    }

    /// Drop a peer (leave message or transport teardown) and re-announce
    /// presence. Document state is untouched.
    pub async fn disconnect(&self, user_id: &str) {
        let removed = self.peers.write().await.remove(user_id).is_some();
        if removed {
            debug!(page_id = %self.page_id, user_id, "peer disconnected");
            self.broadcast_presence().await;
        }
    }

    /// Handle one raw inbound frame from `from_user`. Malformed frames are
    /// dropped silently.
    pub async fn handle_raw(&self, from_user: &str, raw: &str) {
        if let Some(message) = decode_message(raw) {
            self.handle(from_user, message).await;
        }
    }

    pub async fn handle(&self, from_user: &str, message: WireMessage) {
        match message {
            WireMessage::Join { .. } => {
                // Peers register through `connect`; a join frame just
                // refreshes the roster for everyone.
                self.broadcast_presence().await;
            }

            WireMessage::Cursor { x, y, selected_node_id, .. } => {
                // Identity is stamped from the roster, not trusted from the
                // frame. Display-only: never touches the document.
                let stamped = {
                    let peers = self.peers.read().await;
                    peers.get(from_user).map(|peer| WireMessage::Cursor {
                        user_id: peer.info.user_id.clone(),
                        user_name: peer.info.user_name.clone(),
                        color: peer.info.color.clone(),
                        x,
                        y,
                        selected_node_id,
                    })
                };
                if let Some(message) = stamped {
                    self.broadcast_except(from_user, message).await;
                }
            }

            WireMessage::Change { operation } => {
                let applied = {
                    let mut engine = self.engine.lock().await;
                    engine.apply_remote(operation.clone().into())
                };
                match applied {
                    Ok(()) => {
                        self.broadcast_except(from_user, WireMessage::Change { operation })
                            .await;
                    }
                    Err(error) if error.is_benign() => {
                        // Target already gone (racing delete). Skip quietly.
                        debug!(%error, from_user, "remote change skipped");
                    }
                    Err(error) => {
                        warn!(%error, from_user, "remote change rejected");
                    }
                }
            }

            WireMessage::Leave { .. } => {
                self.disconnect(from_user).await;
            }

            // Presence is relay-owned; a peer sending one is ignored.
            WireMessage::Presence { .. } => {}
        }
    }

    /// Publish a locally committed operation to every connected peer.
    pub async fn broadcast_local(&self, operation: ChangeOperation) {
        self.broadcast(WireMessage::Change { operation }).await;
    }

    /// Current roster, join order not guaranteed.
    pub async fn peers(&self) -> Vec<PeerInfo> {
        self.peers
            .read()
            .await
            .values()
            .map(|peer| peer.info.clone())
            .collect()
    }

    async fn broadcast_presence(&self) {
        let users = self.peers().await;
        self.broadcast(WireMessage::Presence { users }).await;
    }

    async fn broadcast(&self, message: WireMessage) {
        let peers = self.peers.read().await;
        for peer in peers.values() {
            let _ = peer.tx.send(message.clone()).await;
        }
    }

    async fn broadcast_except(&self, excluded_user: &str, message: WireMessage) {
        let peers = self.peers.read().await;
        for (user_id, peer) in peers.iter() {
            if user_id != excluded_user {
                let _ = peer.tx.send(message.clone()).await;
            }
        }
    }
}

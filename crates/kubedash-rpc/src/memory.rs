//! In-memory transport hub.
//!
//! Stands in for the host's webview messaging during tests and
//! single-process embedding: one extension endpoint, any number of webview
//! peers, ordered per-peer delivery, and send-to-each broadcast on the
//! extension side. Each side drains its inbound queue into an endpoint via
//! [`spawn_pump`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::transport::{MessageEndpoint, RawTransport, TransportError};

type ClientMap = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<Value>>>>;

/// Pairs one extension side with any number of webview peers.
pub struct MemoryHub {
    extension_tx: mpsc::UnboundedSender<Value>,
    clients: ClientMap,
}

/// Extension-side transport; `post` reaches every connected peer.
pub struct ExtensionTransport {
    clients: ClientMap,
}

/// Webview-side transport; `post` reaches the extension.
pub struct WebviewTransport {
    peer: String,
    tx: mpsc::UnboundedSender<Value>,
}

impl MemoryHub {
    /// Create a hub. Returns the hub, the extension-side transport, and the
    /// extension's inbound queue.
    #[must_use]
    pub fn new() -> (Self, ExtensionTransport, mpsc::UnboundedReceiver<Value>) {
        let (extension_tx, extension_rx) = mpsc::unbounded_channel();
        let clients: ClientMap = Arc::new(RwLock::new(HashMap::new()));
        let hub = Self {
            extension_tx,
            clients: clients.clone(),
        };
        (hub, ExtensionTransport { clients }, extension_rx)
    }

    /// Attach a new webview peer. Returns its transport and inbound queue.
    #[must_use]
    pub fn connect(&self) -> (WebviewTransport, mpsc::UnboundedReceiver<Value>) {
        let peer = Uuid::now_v7().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = self.clients.write().insert(peer.clone(), tx);
        debug!(peer, "webview peer connected");
        (
            WebviewTransport {
                peer,
                tx: self.extension_tx.clone(),
            },
            rx,
        )
    }

    /// Detach a peer; the extension stops sending to it.
    pub fn disconnect(&self, peer: &str) {
        if self.clients.write().remove(peer).is_some() {
            debug!(peer, "webview peer disconnected");
        }
    }

    /// Number of attached peers.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.clients.read().len()
    }
}

impl WebviewTransport {
    /// This peer's hub-assigned id.
    #[must_use]
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

impl RawTransport for ExtensionTransport {
    fn post(&self, message: Value) -> Result<(), TransportError> {
        let mut dead = Vec::new();
        {
            let clients = self.clients.read();
            for (peer, tx) in clients.iter() {
                if tx.send(message.clone()).is_err() {
                    dead.push(peer.clone());
                }
            }
        }
        if !dead.is_empty() {
            let mut clients = self.clients.write();
            for peer in dead {
                if clients.remove(&peer).is_some() {
                    debug!(peer, "pruned dead webview peer");
                }
            }
        }
        Ok(())
    }
}

impl RawTransport for WebviewTransport {
    fn post(&self, message: Value) -> Result<(), TransportError> {
        self.tx.send(message).map_err(|_| TransportError::Closed)
    }
}

/// Drain an inbound queue into an endpoint until the queue closes.
pub fn spawn_pump(
    mut rx: mpsc::UnboundedReceiver<Value>,
    endpoint: Arc<dyn MessageEndpoint>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            endpoint.handle_message(message).await;
        }
    })
}

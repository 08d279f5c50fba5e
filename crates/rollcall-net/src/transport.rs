//! Transport abstraction for peer messaging.
//!
//! The transport layer owns the peer registry and handles frame delivery.
//! Implementations include WebSockets (production) and an in-memory
//! channel network (tests).

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::messages::{PeerId, PeerMessage};

/// Transport trait for sending and receiving peer messages.
///
/// Implementations must be thread-safe (Send + Sync). A send failure to a
/// peer deregisters exactly that peer; there is no automatic reconnect.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a message to a specific peer.
    ///
    /// On failure the peer is deregistered and the error returned.
    async fn send(&self, peer: &PeerId, message: PeerMessage) -> Result<()>;

    /// Broadcast a message to every registered peer.
    ///
    /// Per-peer failures deregister only that peer and do not abort the
    /// broadcast. Returns the number of peers the message reached.
    async fn broadcast(&self, message: PeerMessage) -> Result<usize>;

    /// Receive the next message from any peer.
    ///
    /// Returns the sender's PeerId and the message. Blocks until a message
    /// is available or the transport shuts down.
    async fn recv(&self) -> Result<(PeerId, PeerMessage)>;

    /// Receive with timeout.
    ///
    /// Returns None if the timeout expires before a message arrives.
    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<(PeerId, PeerMessage)>>;

    /// List currently registered peers.
    async fn connected_peers(&self) -> Vec<PeerId>;

    /// Number of currently registered peers.
    async fn peer_count(&self) -> usize;
}

/// A simple in-memory transport for testing.
///
/// Uses channels to simulate message passing between nodes.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{mpsc, RwLock};

    /// Message envelope for internal routing.
    #[derive(Debug, Clone)]
    struct Envelope {
        from: PeerId,
        message: PeerMessage,
    }

    /// Shared state for the memory transport network.
    pub struct MemoryNetwork {
        /// Sender channels for each node.
        senders: RwLock<HashMap<PeerId, mpsc::Sender<Envelope>>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self {
                senders: RwLock::new(HashMap::new()),
            })
        }

        /// Create a transport connected to this network.
        pub async fn create_transport(self: &Arc<Self>) -> MemoryTransport {
            let node_id = PeerId::random();
            let (tx, rx) = mpsc::channel(1000);

            self.senders.write().await.insert(node_id, tx);

            MemoryTransport {
                node_id,
                network: Arc::clone(self),
                receiver: RwLock::new(rx),
            }
        }

        /// Drop a node from the network (simulates a disconnect).
        pub async fn disconnect(&self, node_id: &PeerId) {
            self.senders.write().await.remove(node_id);
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        node_id: PeerId,
        network: Arc<MemoryNetwork>,
        receiver: RwLock<mpsc::Receiver<Envelope>>,
    }

    impl MemoryTransport {
        /// This transport's own identity on the network.
        pub fn node_id(&self) -> PeerId {
            self.node_id
        }
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn send(&self, peer: &PeerId, message: PeerMessage) -> Result<()> {
            let sender = {
                let senders = self.network.senders.read().await;
                senders.get(peer).cloned()
            };

            match sender {
                Some(sender) => {
                    let envelope = Envelope {
                        from: self.node_id,
                        message,
                    };
                    if sender.send(envelope).await.is_err() {
                        self.network.senders.write().await.remove(peer);
                        return Err(crate::error::NetError::PeerSend(*peer));
                    }
                    Ok(())
                }
                None => Err(crate::error::NetError::PeerNotConnected(*peer)),
            }
        }

        async fn broadcast(&self, message: PeerMessage) -> Result<usize> {
            let targets: Vec<(PeerId, mpsc::Sender<Envelope>)> = {
                let senders = self.network.senders.read().await;
                senders
                    .iter()
                    .filter(|(id, _)| *id != &self.node_id)
                    .map(|(id, tx)| (*id, tx.clone()))
                    .collect()
            };

            let mut reached = 0;
            for (peer_id, sender) in targets {
                let envelope = Envelope {
                    from: self.node_id,
                    message: message.clone(),
                };
                if sender.send(envelope).await.is_ok() {
                    reached += 1;
                } else {
                    self.network.senders.write().await.remove(&peer_id);
                }
            }
            Ok(reached)
        }

        async fn recv(&self) -> Result<(PeerId, PeerMessage)> {
            let mut rx = self.receiver.write().await;
            match rx.recv().await {
                Some(envelope) => Ok((envelope.from, envelope.message)),
                None => Err(crate::error::NetError::Transport("channel closed".into())),
            }
        }

        async fn recv_timeout(
            &self,
            timeout: Duration,
        ) -> Result<Option<(PeerId, PeerMessage)>> {
            let mut rx = self.receiver.write().await;
            match tokio::time::timeout(timeout, rx.recv()).await {
                Ok(Some(envelope)) => Ok(Some((envelope.from, envelope.message))),
                Ok(None) => Err(crate::error::NetError::Transport("channel closed".into())),
                Err(_) => Ok(None), // Timeout
            }
        }

        async fn connected_peers(&self) -> Vec<PeerId> {
            let senders = self.network.senders.read().await;
            senders
                .keys()
                .filter(|id| *id != &self.node_id)
                .copied()
                .collect()
        }

        async fn peer_count(&self) -> usize {
            self.connected_peers().await.len()
        }
    }
}

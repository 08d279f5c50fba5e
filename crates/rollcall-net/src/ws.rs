//! WebSocket transport: the live peer registry.
//!
//! Each peer is one persistent WebSocket connection, registered on
//! connect/accept and deregistered on the first send failure or disconnect.
//! Every connection gets a reader task (decoding inbound frames) and a
//! writer task (draining an outbound queue).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_tungstenite::{accept_async, connect_async, tungstenite::Message, WebSocketStream};

use crate::error::{NetError, Result};
use crate::messages::{PeerId, PeerMessage};
use crate::transport::Transport;

/// Outbound queue depth per peer.
const OUTBOUND_QUEUE: usize = 256;

/// Inbound queue depth shared across all peers.
const INBOUND_QUEUE: usize = 1024;

/// Registry state shared with the per-connection tasks.
struct Shared {
    peers: RwLock<HashMap<PeerId, mpsc::Sender<Message>>>,
    incoming_tx: mpsc::Sender<(PeerId, PeerMessage)>,
}

impl Shared {
    /// Remove a peer from the registry, logging the new peer count.
    async fn deregister(&self, peer: &PeerId) {
        let mut peers = self.peers.write().await;
        if peers.remove(peer).is_some() {
            tracing::info!(?peer, remaining = peers.len(), "peer deregistered");
        }
    }

    /// Register a freshly established connection and spawn its I/O tasks.
    async fn register<S>(self: &Arc<Self>, ws: WebSocketStream<S>) -> PeerId
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let peer_id = PeerId::random();
        let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);

        {
            let mut peers = self.peers.write().await;
            peers.insert(peer_id, out_tx);
            tracing::info!(peer = ?peer_id, total = peers.len(), "peer registered");
        }

        let (mut ws_sender, mut ws_receiver) = ws.split();

        // Writer: drain the outbound queue into the socket.
        let writer_shared = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if ws_sender.send(frame).await.is_err() {
                    break;
                }
            }
            writer_shared.deregister(&peer_id).await;
        });

        // Reader: decode frames and feed the shared inbound queue.
        let reader_shared = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(frame) = ws_receiver.next().await {
                match frame {
                    Ok(Message::Text(text)) => match PeerMessage::decode(&text) {
                        Ok(message) => {
                            if reader_shared
                                .incoming_tx
                                .send((peer_id, message))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(peer = ?peer_id, error = %e, "dropping malformed frame");
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {} // ping/pong/binary carry no protocol messages
                    Err(e) => {
                        tracing::warn!(peer = ?peer_id, error = %e, "websocket read error");
                        break;
                    }
                }
            }
            reader_shared.deregister(&peer_id).await;
        });

        peer_id
    }
}

/// WebSocket-backed transport and peer registry.
pub struct WsTransport {
    shared: Arc<Shared>,
    incoming: Mutex<mpsc::Receiver<(PeerId, PeerMessage)>>,
}

impl WsTransport {
    /// Create a transport with an empty registry.
    pub fn new() -> Self {
        let (incoming_tx, incoming_rx) = mpsc::channel(INBOUND_QUEUE);
        Self {
            shared: Arc::new(Shared {
                peers: RwLock::new(HashMap::new()),
                incoming_tx,
            }),
            incoming: Mutex::new(incoming_rx),
        }
    }

    /// Start accepting inbound peer connections on `addr`.
    ///
    /// Returns the bound address (useful with port 0). Accepted
    /// connections register symmetrically with outbound ones.
    pub async fn listen(&self, addr: &str) -> Result<SocketAddr> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(%local_addr, "listening for peers");

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer_addr)) => {
                        tracing::debug!(%peer_addr, "inbound connection");
                        let shared = Arc::clone(&shared);
                        tokio::spawn(async move {
                            match accept_async(stream).await {
                                Ok(ws) => {
                                    shared.register(ws).await;
                                }
                                Err(e) => {
                                    tracing::warn!(%peer_addr, error = %e, "handshake failed");
                                }
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept error");
                    }
                }
            }
        });

        Ok(local_addr)
    }

    /// Establish an outbound connection to a peer.
    ///
    /// On success the peer is registered; failures are returned, not
    /// retried.
    pub async fn connect(&self, url: &str) -> Result<PeerId> {
        let (ws, _) = connect_async(url).await?;
        tracing::info!(%url, "connected to peer");
        Ok(self.shared.register(ws).await)
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, peer: &PeerId, message: PeerMessage) -> Result<()> {
        let frame = Message::Text(message.encode()?);

        let sender = {
            let peers = self.shared.peers.read().await;
            peers.get(peer).cloned()
        };

        match sender {
            Some(tx) => {
                if tx.send(frame).await.is_err() {
                    self.shared.deregister(peer).await;
                    Err(NetError::PeerSend(*peer))
                } else {
                    Ok(())
                }
            }
            None => Err(NetError::PeerNotConnected(*peer)),
        }
    }

    async fn broadcast(&self, message: PeerMessage) -> Result<usize> {
        let frame = Message::Text(message.encode()?);

        let targets: Vec<(PeerId, mpsc::Sender<Message>)> = {
            let peers = self.shared.peers.read().await;
            peers.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut reached = 0;
        for (peer_id, tx) in targets {
            if tx.send(frame.clone()).await.is_ok() {
                reached += 1;
            } else {
                self.shared.deregister(&peer_id).await;
            }
        }
        Ok(reached)
    }

    async fn recv(&self) -> Result<(PeerId, PeerMessage)> {
        let mut rx = self.incoming.lock().await;
        rx.recv()
            .await
            .ok_or_else(|| NetError::Transport("incoming channel closed".into()))
    }

    async fn recv_timeout(&self, timeout: Duration) -> Result<Option<(PeerId, PeerMessage)>> {
        let mut rx = self.incoming.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(item)) => Ok(Some(item)),
            Ok(None) => Err(NetError::Transport("incoming channel closed".into())),
            Err(_) => Ok(None), // Timeout
        }
    }

    async fn connected_peers(&self) -> Vec<PeerId> {
        let peers = self.shared.peers.read().await;
        peers.keys().copied().collect()
    }

    async fn peer_count(&self) -> usize {
        let peers = self.shared.peers.read().await;
        peers.len()
    }
}

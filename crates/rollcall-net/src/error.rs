//! Error types for the net module.

use thiserror::Error;

use crate::messages::PeerId;

/// Errors that can occur during peer messaging.
#[derive(Debug, Error)]
pub enum NetError {
    /// A frame failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(String),

    /// A frame exceeded the size limit.
    #[error("frame too large: {size} bytes (limit {limit})")]
    FrameTooLarge { size: usize, limit: usize },

    /// The target peer is not in the registry.
    #[error("peer not connected: {0:?}")]
    PeerNotConnected(PeerId),

    /// A send failed; the peer has been deregistered.
    #[error("send to peer {0:?} failed, peer deregistered")]
    PeerSend(PeerId),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// WebSocket protocol error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for net operations.
pub type Result<T> = std::result::Result<T, NetError>;

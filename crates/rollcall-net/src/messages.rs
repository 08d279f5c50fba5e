//! Peer wire protocol message types.
//!
//! Messages travel as discrete JSON text frames, one `{type, data}` object
//! per frame, decoded independently with no partial-message state carried
//! between frames.

use serde::{Deserialize, Serialize};
use std::fmt;

use rollcall_core::{Block, SessionId};

use crate::error::{NetError, Result};

/// Structural identifier for a live peer connection.
///
/// Assigned randomly per connection; there is no stable peer identity
/// across reconnects. Registry membership is the entire notion of "peer".
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 32]);

impl PeerId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a random peer ID.
    pub fn random() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen())
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", &hex::encode(self.0)[..16])
    }
}

/// Message size limits.
pub mod limits {
    /// Max bytes in a single frame.
    pub const MAX_FRAME_BYTES: usize = 1 << 20;
}

/// Peer protocol messages.
///
/// The envelope is `{type, data}`; payload fields use the wire names the
/// protocol mandates (`sessionId`, `attendance`, `result`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerMessage {
    /// Ask one peer for its full chain (resynchronization).
    FetchChain,

    /// Full chain; the data is the bare block array.
    ChainResponse(Vec<Block>),

    /// A freshly sealed block, with the session it notarized.
    #[serde(rename_all = "camelCase")]
    NewBlock {
        session_id: SessionId,
        block: Block,
    },

    /// Ask every peer whether it can vouch for an attendance claim.
    #[serde(rename_all = "camelCase")]
    VerifyRequest {
        session_id: SessionId,
        attendance: String,
    },

    /// One peer's vote on a verification request.
    #[serde(rename_all = "camelCase")]
    VerifyResponse {
        session_id: SessionId,
        attendance: String,
        result: bool,
    },
}

impl PeerMessage {
    /// Encode into a single text frame.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| NetError::Codec(e.to_string()))
    }

    /// Decode a single text frame.
    ///
    /// Fails explicitly on malformed input; there are no partially-decoded
    /// messages.
    pub fn decode(frame: &str) -> Result<Self> {
        if frame.len() > limits::MAX_FRAME_BYTES {
            return Err(NetError::FrameTooLarge {
                size: frame.len(),
                limit: limits::MAX_FRAME_BYTES,
            });
        }
        serde_json::from_str(frame).map_err(|e| NetError::Codec(e.to_string()))
    }
}

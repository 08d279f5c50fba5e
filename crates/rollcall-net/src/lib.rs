//! # Rollcall Net
//!
//! Peer wire protocol and transports for the rollcall ledger.
//!
//! ## Overview
//!
//! Nodes exchange five message kinds over persistent bidirectional
//! connections, one JSON object per text frame:
//!
//! ```text
//! FETCH_CHAIN      ask one peer for its full chain
//! CHAIN_RESPONSE   full chain (bare block array)
//! NEW_BLOCK        freshly sealed block + session id
//! VERIFY_REQUEST   poll peers about an attendance claim
//! VERIFY_RESPONSE  one peer's boolean vote
//! ```
//!
//! The [`Transport`] trait owns the peer registry: connections register on
//! connect/accept and deregister on the first send failure or disconnect.
//! [`WsTransport`] is the production WebSocket implementation;
//! [`MemoryNetwork`]/[`MemoryTransport`] simulate a peer set in tests.

pub mod error;
pub mod messages;
pub mod transport;
pub mod ws;

pub use error::{NetError, Result};
pub use messages::{limits, PeerId, PeerMessage};
pub use transport::{
    memory::{MemoryNetwork, MemoryTransport},
    Transport,
};
pub use ws::WsTransport;

//! Error types for the node.

use rollcall_core::{ChainError, SessionId};
use rollcall_net::NetError;
use rollcall_store::StoreError;
use thiserror::Error;

/// Errors that can occur during node operations.
///
/// Session errors are client-input problems surfaced as negative results.
/// Chain validation and peer failures are recovered locally (resync, deny,
/// drop peer); only broken ledger invariants are treated as fatal.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Chain error (invalid block, empty ledger, bad index).
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Network error.
    #[error("network error: {0}")]
    Net(#[from] NetError),

    /// The session has not been opened (or was already closed).
    #[error("session {0} is not open")]
    UnknownSession(SessionId),

    /// The session is already open.
    #[error("session {0} is already open")]
    SessionAlreadyOpen(SessionId),

    /// The session was already sealed into a block.
    #[error("session {0} is already notarized")]
    SessionAlreadyNotarized(SessionId),
}

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, NodeError>;

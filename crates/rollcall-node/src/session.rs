//! Session queue: transient staging for attendance proofs between
//! session-open and session-close.
//!
//! An entry exists only while its session is open; closing consumes the
//! buffer into exactly one block. Sessions that are never closed are simply
//! abandoned.

use std::collections::HashMap;

use rollcall_core::SessionId;

use crate::error::{NodeError, Result};

/// Buffers of proofs for currently open sessions.
#[derive(Debug, Default)]
pub struct SessionQueue {
    open: HashMap<SessionId, Vec<String>>,
}

impl SessionQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session with an empty buffer.
    pub fn open(&mut self, session: SessionId) -> Result<()> {
        if self.open.contains_key(&session) {
            return Err(NodeError::SessionAlreadyOpen(session));
        }
        self.open.insert(session, Vec::new());
        Ok(())
    }

    /// True if the session is currently open.
    pub fn is_open(&self, session: &SessionId) -> bool {
        self.open.contains_key(session)
    }

    /// Append a proof to an open session. Duplicates are allowed.
    pub fn submit(&mut self, session: &SessionId, proof: String) -> Result<()> {
        match self.open.get_mut(session) {
            Some(buffer) => {
                buffer.push(proof);
                Ok(())
            }
            None => Err(NodeError::UnknownSession(session.clone())),
        }
    }

    /// Close a session, returning its accumulated proofs.
    ///
    /// An empty buffer is returned as-is; the caller still seals a block.
    pub fn close(&mut self, session: &SessionId) -> Result<Vec<String>> {
        self.open
            .remove(session)
            .ok_or_else(|| NodeError::UnknownSession(session.clone()))
    }

    /// Drop every open session.
    pub fn clear(&mut self) {
        self.open.clear();
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.open.len()
    }

    /// True when no session is open.
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}

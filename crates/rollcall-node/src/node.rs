//! The Node: one peer of the attendance ledger network.
//!
//! A node owns its chain, root index, and session queue behind a single
//! lock; every handler completes its state transition before returning,
//! preserving the atomicity the protocol assumes. Peer messages arrive
//! through the transport's receive loop and are dispatched here.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;

use rollcall_core::{Block, Chain, SessionId};
use rollcall_net::{PeerId, PeerMessage, Transport};
use rollcall_store::{RootEntry, Store};

use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::roots::RootIndex;
use crate::session::SessionQueue;
use crate::verify::{Verdict, Verifier, VoteOutcome};

/// Mutable node state, guarded by one lock.
struct NodeState {
    chain: Chain,
    roots: RootIndex,
    sessions: SessionQueue,
}

/// A single ledger node.
pub struct Node<S: Store, T: Transport> {
    store: Arc<S>,
    transport: Arc<T>,
    config: NodeConfig,
    state: Mutex<NodeState>,
    verifier: Verifier,
}

impl<S: Store, T: Transport> Node<S, T> {
    /// Load persisted state and assemble the node.
    ///
    /// An empty store bootstraps a fresh ledger at genesis and persists it;
    /// otherwise the persisted chain is validated end-to-end before use.
    pub async fn start(store: S, transport: T, config: NodeConfig) -> Result<Self> {
        let store = Arc::new(store);

        let blocks = store.load_blocks().await?;
        let chain = if blocks.is_empty() {
            let chain = Chain::bootstrap();
            store.append_block(chain.latest()?).await?;
            tracing::info!("bootstrapped fresh ledger at genesis");
            chain
        } else {
            Chain::from_blocks(blocks)?
        };

        let roots = RootIndex::from_entries(&store.load_roots().await?);
        tracing::info!(blocks = chain.len(), roots = roots.len(), "node started");

        Ok(Self {
            store,
            transport: Arc::new(transport),
            config,
            state: Mutex::new(NodeState {
                chain,
                roots,
                sessions: SessionQueue::new(),
            }),
            verifier: Verifier::new(),
        })
    }

    /// Access the transport, e.g. to connect to peers.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session Operations
    // ─────────────────────────────────────────────────────────────────────

    /// Open a session for attendance submissions.
    pub async fn open_session(&self, session: SessionId) -> Result<()> {
        let mut state = self.state.lock().await;

        // A session whose sealing block exists in the current chain must
        // not be re-notarized.
        if let Some(index) = state.roots.lookup(&session) {
            if (index as usize) < state.chain.len() {
                return Err(NodeError::SessionAlreadyNotarized(session));
            }
        }

        state.sessions.open(session.clone())?;
        tracing::debug!(%session, "session opened");
        Ok(())
    }

    /// Buffer one attendance proof for an open session.
    pub async fn submit_attendance(
        &self,
        session: &SessionId,
        proof: impl Into<String>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        state.sessions.submit(session, proof.into())
    }

    /// Seal a session's buffered proofs into the next block.
    ///
    /// Appends and persists the block, records the session root, then
    /// broadcasts `NEW_BLOCK`. An empty buffer still seals an (empty)
    /// block so the session holds a position in the chain.
    pub async fn close_session(&self, session: &SessionId) -> Result<Block> {
        let block = {
            let mut state = self.state.lock().await;
            let proofs = state.sessions.close(session)?;

            let block = Block::next(state.chain.latest()?, proofs, now_seconds());
            state.chain.append(block.clone())?;
            self.store.append_block(&block).await?;

            state.roots.record(session.clone(), block.index);
            self.store
                .append_root(&RootEntry::new(session.clone(), block.index))
                .await?;

            tracing::info!(
                %session,
                index = block.index,
                proofs = block.attendances.len(),
                "session sealed"
            );
            block
        };

        let message = PeerMessage::NewBlock {
            session_id: session.clone(),
            block: block.clone(),
        };
        match self.transport.broadcast(message).await {
            Ok(reached) => tracing::debug!(reached, "new block broadcast"),
            Err(e) => tracing::warn!(error = %e, "new block broadcast failed"),
        }

        Ok(block)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────

    /// Answer a verification from the local ledger only.
    pub async fn verify_local(&self, session: &SessionId, proof: &str) -> bool {
        let state = self.state.lock().await;
        check_local(&state, session, proof)
    }

    /// Distributed verification.
    ///
    /// A local hit confirms immediately. With no peers the claim is denied
    /// (nothing can corroborate it). Otherwise peers are polled and a
    /// strict majority of true votes confirms; a timeout before the full
    /// vote count denies, and late votes are ignored.
    pub async fn verify(&self, session: &SessionId, proof: &str) -> Result<Verdict> {
        {
            let state = self.state.lock().await;
            if check_local(&state, session, proof) {
                tracing::debug!(%session, "claim verified locally");
                return Ok(Verdict::Confirmed);
            }
        }

        let expected = self.transport.peer_count().await;
        if expected == 0 {
            tracing::debug!(%session, "no peers to corroborate, denying");
            return Ok(Verdict::Denied);
        }

        let key = (session.clone(), proof.to_string());
        let pending = self.verifier.register(key.clone(), expected);

        let message = PeerMessage::VerifyRequest {
            session_id: session.clone(),
            attendance: proof.to_string(),
        };
        if let Err(e) = self.transport.broadcast(message).await {
            tracing::warn!(error = %e, "verify broadcast failed");
            self.verifier.discard(&key);
            return Ok(Verdict::Denied);
        }
        tracing::debug!(%session, expected, "polling peers");

        match tokio::time::timeout(self.config.verify_timeout, pending).await {
            Ok(Ok(verdict)) => Ok(verdict),
            // The shared record was discarded by another waiter's timeout.
            Ok(Err(_)) => Ok(Verdict::Denied),
            Err(_) => {
                self.verifier.discard(&key);
                tracing::debug!(%session, "verification timed out, denying");
                Ok(Verdict::Denied)
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Message Handling
    // ─────────────────────────────────────────────────────────────────────

    /// Receive loop: dispatch inbound frames until the transport closes.
    ///
    /// Handler failures are logged and never terminate the loop.
    pub async fn run(&self) {
        loop {
            match self.transport.recv().await {
                Ok((peer, message)) => {
                    if let Err(e) = self.handle_message(peer, message).await {
                        tracing::warn!(?peer, error = %e, "message handler failed");
                    }
                }
                Err(e) => {
                    tracing::info!(error = %e, "transport closed, stopping receive loop");
                    return;
                }
            }
        }
    }

    /// Handle one inbound frame.
    pub async fn handle_message(&self, from: PeerId, message: PeerMessage) -> Result<()> {
        match message {
            PeerMessage::FetchChain => {
                let blocks = {
                    let state = self.state.lock().await;
                    state.chain.blocks().to_vec()
                };
                self.transport
                    .send(&from, PeerMessage::ChainResponse(blocks))
                    .await?;
            }

            PeerMessage::ChainResponse(blocks) => {
                self.handle_chain_response(blocks).await?;
            }

            PeerMessage::NewBlock { session_id, block } => {
                self.handle_new_block(from, session_id, block).await?;
            }

            PeerMessage::VerifyRequest {
                session_id,
                attendance,
            } => {
                let result = self.verify_local(&session_id, &attendance).await;
                self.transport
                    .send(
                        &from,
                        PeerMessage::VerifyResponse {
                            session_id,
                            attendance,
                            result,
                        },
                    )
                    .await?;
            }

            PeerMessage::VerifyResponse {
                session_id,
                attendance,
                result,
            } => {
                let key = (session_id, attendance);
                match self.verifier.record_vote(&key, result) {
                    VoteOutcome::Decided(verdict) => {
                        tracing::debug!(%verdict, "verification decided by quorum");
                    }
                    VoteOutcome::Awaiting { have, expected } => {
                        tracing::trace!(have, expected, "awaiting further votes");
                    }
                    VoteOutcome::Unmatched => {
                        tracing::trace!("ignoring late or unsolicited vote");
                    }
                }
            }
        }

        Ok(())
    }

    /// A peer announced a freshly sealed block.
    ///
    /// A valid successor is appended and its session root recorded. Anything
    /// else means the local chain is stale or diverged: refetch the sender's
    /// whole chain.
    async fn handle_new_block(
        &self,
        from: PeerId,
        session: SessionId,
        block: Block,
    ) -> Result<()> {
        let appended = {
            let mut state = self.state.lock().await;
            match state.chain.append(block.clone()) {
                Ok(()) => {
                    self.store.append_block(&block).await?;
                    state.roots.record(session.clone(), block.index);
                    self.store
                        .append_root(&RootEntry::new(session.clone(), block.index))
                        .await?;
                    true
                }
                Err(e) => {
                    tracing::warn!(%session, error = %e, "block is not a valid successor, resynchronizing");
                    false
                }
            }
        };

        if appended {
            tracing::info!(%session, index = block.index, "peer block appended");
        } else {
            self.transport.send(&from, PeerMessage::FetchChain).await?;
        }
        Ok(())
    }

    /// A peer sent its full chain in answer to `FETCH_CHAIN`.
    ///
    /// The blocks are sorted by index, validated end-to-end, and adopted
    /// wholesale. No fork-choice rule is applied beyond validity: whichever
    /// valid chain arrives first wins.
    async fn handle_chain_response(&self, mut blocks: Vec<Block>) -> Result<()> {
        blocks.sort_by_key(|b| b.index);

        let replacement = match Chain::from_blocks(blocks) {
            Ok(chain) => chain,
            Err(e) => {
                tracing::warn!(error = %e, "received chain failed validation, keeping local chain");
                return Ok(());
            }
        };

        let mut state = self.state.lock().await;
        self.store.replace_blocks(replacement.blocks()).await?;
        tracing::info!(
            from_len = state.chain.len(),
            to_len = replacement.len(),
            "chain replaced"
        );
        state.chain.replace(replacement);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Clear the ledger back to a single genesis block and an empty root
    /// index, dropping any open sessions.
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;

        self.store.reset().await?;
        let chain = Chain::bootstrap();
        self.store.append_block(chain.latest()?).await?;

        state.chain = chain;
        state.roots.clear();
        state.sessions.clear();
        tracing::info!("ledger reset to genesis");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// The most recent block.
    pub async fn latest_block(&self) -> Result<Block> {
        let state = self.state.lock().await;
        Ok(state.chain.latest()?.clone())
    }

    /// Current chain length.
    pub async fn chain_len(&self) -> usize {
        let state = self.state.lock().await;
        state.chain.len()
    }

    /// The sealing block index recorded for a session, if any.
    pub async fn root_of(&self, session: &SessionId) -> Option<u64> {
        let state = self.state.lock().await;
        state.roots.lookup(session)
    }
}

/// Membership check against the locally indexed block.
fn check_local(state: &NodeState, session: &SessionId, proof: &str) -> bool {
    let Some(index) = state.roots.lookup(session) else {
        return false;
    };

    match state.chain.block_at(index) {
        Ok(block) => block.attendances.contains(proof),
        Err(e) => {
            // A root entry can point past the tip after a wholesale chain
            // replacement; the claim is unverifiable, not fatal.
            tracing::warn!(%session, index, error = %e, "root entry points outside the chain");
            false
        }
    }
}

/// Current time, seconds since epoch.
fn now_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::Attendances;
    use rollcall_net::MemoryNetwork;
    use rollcall_store::MemoryStore;

    async fn lone_node() -> Node<MemoryStore, rollcall_net::MemoryTransport> {
        let network = MemoryNetwork::new();
        let transport = network.create_transport().await;
        Node::start(MemoryStore::new(), transport, NodeConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_start_bootstraps_genesis() {
        let node = lone_node().await;
        assert_eq!(node.chain_len().await, 1);
        assert!(node.latest_block().await.unwrap().attendances.is_genesis());
    }

    #[tokio::test]
    async fn test_session_scenario() {
        let node = lone_node().await;
        let session = SessionId::new("S1");

        node.open_session(session.clone()).await.unwrap();
        node.submit_attendance(&session, "proofA").await.unwrap();
        node.submit_attendance(&session, "proofB").await.unwrap();
        let block = node.close_session(&session).await.unwrap();

        assert_eq!(block.index, 1);
        assert_eq!(
            block.attendances,
            Attendances::Proofs(vec!["proofA".into(), "proofB".into()])
        );
        assert_eq!(node.root_of(&session).await, Some(1));

        assert!(node.verify_local(&session, "proofA").await);
        assert!(node.verify_local(&session, "proofB").await);
        assert!(!node.verify_local(&session, "proofC").await);
        assert!(!node.verify_local(&SessionId::new("ghost"), "proofA").await);
    }

    #[tokio::test]
    async fn test_reopen_notarized_session_rejected() {
        let node = lone_node().await;
        let session = SessionId::new("S1");

        node.open_session(session.clone()).await.unwrap();
        node.close_session(&session).await.unwrap();

        assert!(matches!(
            node.open_session(session).await,
            Err(NodeError::SessionAlreadyNotarized(_))
        ));
    }

    #[tokio::test]
    async fn test_close_empty_session_still_seals() {
        let node = lone_node().await;
        let session = SessionId::new("empty");

        node.open_session(session.clone()).await.unwrap();
        let block = node.close_session(&session).await.unwrap();

        assert_eq!(block.index, 1);
        assert!(block.attendances.is_empty());
        assert_eq!(node.root_of(&session).await, Some(1));
    }

    #[tokio::test]
    async fn test_verify_confirms_locally_without_peers() {
        let node = lone_node().await;
        let session = SessionId::new("S1");

        node.open_session(session.clone()).await.unwrap();
        node.submit_attendance(&session, "proofA").await.unwrap();
        node.close_session(&session).await.unwrap();

        assert_eq!(
            node.verify(&session, "proofA").await.unwrap(),
            Verdict::Confirmed
        );
    }

    #[tokio::test]
    async fn test_verify_denies_with_no_peers_and_no_local_match() {
        let node = lone_node().await;
        assert_eq!(
            node.verify(&SessionId::new("S1"), "proofA").await.unwrap(),
            Verdict::Denied
        );
    }

    #[tokio::test]
    async fn test_reset_restores_genesis_state() {
        let node = lone_node().await;
        let session = SessionId::new("S1");

        node.open_session(session.clone()).await.unwrap();
        node.submit_attendance(&session, "proofA").await.unwrap();
        node.close_session(&session).await.unwrap();
        assert_eq!(node.chain_len().await, 2);

        node.reset().await.unwrap();
        assert_eq!(node.chain_len().await, 1);
        assert_eq!(node.root_of(&session).await, None);
        assert!(node.latest_block().await.unwrap().attendances.is_genesis());

        // The session can be notarized again after the reset.
        node.open_session(session.clone()).await.unwrap();
        node.close_session(&session).await.unwrap();
        assert_eq!(node.root_of(&session).await, Some(1));
    }

    #[tokio::test]
    async fn test_valid_peer_block_appended_with_root() {
        let network = MemoryNetwork::new();
        let node = Node::start(
            MemoryStore::new(),
            network.create_transport().await,
            NodeConfig::default(),
        )
        .await
        .unwrap();
        let sender = network.create_transport().await;

        let block = Block::next(
            &node.latest_block().await.unwrap(),
            vec!["p1".into()],
            1_700_000_000,
        );
        node.handle_message(
            sender.node_id(),
            PeerMessage::NewBlock {
                session_id: SessionId::new("S1"),
                block: block.clone(),
            },
        )
        .await
        .unwrap();

        assert_eq!(node.chain_len().await, 2);
        assert_eq!(node.root_of(&SessionId::new("S1")).await, Some(1));
        assert!(node.verify_local(&SessionId::new("S1"), "p1").await);
    }

    #[tokio::test]
    async fn test_invalid_peer_block_triggers_refetch_from_sender() {
        let network = MemoryNetwork::new();
        let node = Node::start(
            MemoryStore::new(),
            network.create_transport().await,
            NodeConfig::default(),
        )
        .await
        .unwrap();
        let sender = network.create_transport().await;

        // A block from two steps ahead cannot attach to the local chain.
        let genesis = node.latest_block().await.unwrap();
        let missing = Block::next(&genesis, vec!["lost".into()], 1_700_000_000);
        let ahead = Block::next(&missing, vec!["p".into()], 1_700_000_100);

        node.handle_message(
            sender.node_id(),
            PeerMessage::NewBlock {
                session_id: SessionId::new("S2"),
                block: ahead,
            },
        )
        .await
        .unwrap();

        assert_eq!(node.chain_len().await, 1);
        let (_, msg) = sender.recv().await.unwrap();
        assert_eq!(msg, PeerMessage::FetchChain);
    }

    #[tokio::test]
    async fn test_fetch_chain_answered_with_full_chain() {
        let network = MemoryNetwork::new();
        let node = Node::start(
            MemoryStore::new(),
            network.create_transport().await,
            NodeConfig::default(),
        )
        .await
        .unwrap();
        let peer = network.create_transport().await;

        let session = SessionId::new("S1");
        node.open_session(session.clone()).await.unwrap();
        node.submit_attendance(&session, "p").await.unwrap();
        node.close_session(&session).await.unwrap();
        // Drain the NEW_BLOCK broadcast the close produced.
        let _ = peer.recv().await.unwrap();

        node.handle_message(peer.node_id(), PeerMessage::FetchChain)
            .await
            .unwrap();

        let (_, msg) = peer.recv().await.unwrap();
        match msg {
            PeerMessage::ChainResponse(blocks) => assert_eq!(blocks.len(), 2),
            other => panic!("expected CHAIN_RESPONSE, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chain_response_adopted_wholesale() {
        let network = MemoryNetwork::new();
        let node = Node::start(
            MemoryStore::new(),
            network.create_transport().await,
            NodeConfig::default(),
        )
        .await
        .unwrap();
        let peer = network.create_transport().await;

        let mut remote = Chain::bootstrap();
        for i in 1..4 {
            let block = Block::next(
                remote.latest().unwrap(),
                vec![format!("p{i}")],
                1_700_000_000 + i,
            );
            remote.append(block).unwrap();
        }

        // Deliver out of order: the handler sorts by index before adopting.
        let mut shuffled = remote.blocks().to_vec();
        shuffled.reverse();
        node.handle_message(peer.node_id(), PeerMessage::ChainResponse(shuffled))
            .await
            .unwrap();

        assert_eq!(node.chain_len().await, 4);
    }

    #[tokio::test]
    async fn test_invalid_chain_response_ignored() {
        let network = MemoryNetwork::new();
        let node = Node::start(
            MemoryStore::new(),
            network.create_transport().await,
            NodeConfig::default(),
        )
        .await
        .unwrap();
        let peer = network.create_transport().await;

        let genesis = Block::genesis();
        let mut tampered = Block::next(&genesis, vec!["p".into()], 1_700_000_000);
        tampered.attendances = Attendances::Proofs(vec!["forged".into()]);

        node.handle_message(
            peer.node_id(),
            PeerMessage::ChainResponse(vec![genesis, tampered]),
        )
        .await
        .unwrap();

        assert_eq!(node.chain_len().await, 1);
    }

    #[tokio::test]
    async fn test_verify_request_answered_with_local_vote() {
        let network = MemoryNetwork::new();
        let node = Node::start(
            MemoryStore::new(),
            network.create_transport().await,
            NodeConfig::default(),
        )
        .await
        .unwrap();
        let peer = network.create_transport().await;

        let session = SessionId::new("S1");
        node.open_session(session.clone()).await.unwrap();
        node.submit_attendance(&session, "proofA").await.unwrap();
        node.close_session(&session).await.unwrap();
        let _ = peer.recv().await.unwrap(); // drain the broadcast

        node.handle_message(
            peer.node_id(),
            PeerMessage::VerifyRequest {
                session_id: session.clone(),
                attendance: "proofA".into(),
            },
        )
        .await
        .unwrap();

        let (_, msg) = peer.recv().await.unwrap();
        assert_eq!(
            msg,
            PeerMessage::VerifyResponse {
                session_id: session,
                attendance: "proofA".into(),
                result: true,
            }
        );
    }

    #[tokio::test]
    async fn test_restart_reloads_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let network = MemoryNetwork::new();
        let session = SessionId::new("S1");

        {
            let store = rollcall_store::SqliteStore::open(&path).unwrap();
            let node = Node::start(store, network.create_transport().await, NodeConfig::default())
                .await
                .unwrap();
            node.open_session(session.clone()).await.unwrap();
            node.submit_attendance(&session, "proofA").await.unwrap();
            node.close_session(&session).await.unwrap();
        }

        let store = rollcall_store::SqliteStore::open(&path).unwrap();
        let node = Node::start(store, network.create_transport().await, NodeConfig::default())
            .await
            .unwrap();

        assert_eq!(node.chain_len().await, 2);
        assert!(node.verify_local(&session, "proofA").await);
    }
}

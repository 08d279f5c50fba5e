//! # Rollcall Node
//!
//! The node facade for the rollcall attendance ledger: sessions,
//! verification, and peer message dispatch over a hash-linked chain.
//!
//! ## Overview
//!
//! Each node holds a copy of the append-only chain of attendance blocks.
//! Closing a session seals its buffered proofs into a new block, which is
//! persisted, indexed by session, and broadcast to peers. A verification
//! query is answered from the local chain when possible; otherwise peers
//! are polled and a strict majority of true votes confirms the claim, with
//! a timeout resolving unanswered polls as denied.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rollcall_node::{Node, NodeConfig};
//! use rollcall_net::WsTransport;
//! use rollcall_store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let transport = WsTransport::new();
//!     transport.listen("0.0.0.0:5000").await.unwrap();
//!
//!     let node = Node::start(store, transport, NodeConfig::default())
//!         .await
//!         .unwrap();
//!
//!     // node.open_session("S1".into()).await.unwrap();
//!     // node.submit_attendance(&"S1".into(), "proofA").await.unwrap();
//!     // node.close_session(&"S1".into()).await.unwrap();
//!     // let verdict = node.verify(&"S1".into(), "proofA").await.unwrap();
//!
//!     node.run().await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod node;
pub mod roots;
pub mod session;
pub mod verify;

// Re-export component crates
pub use rollcall_core as core;
pub use rollcall_net as net;
pub use rollcall_store as store;

// Re-export main types for convenience
pub use config::NodeConfig;
pub use error::{NodeError, Result};
pub use node::Node;
pub use roots::RootIndex;
pub use session::SessionQueue;
pub use verify::{Verdict, Verifier, VoteKey, VoteOutcome};

// Re-export commonly used core types
pub use rollcall_core::{Attendances, Block, BlockHash, Chain, SessionId};

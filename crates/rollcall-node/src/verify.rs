//! Distributed verification bookkeeping.
//!
//! Every in-flight request is keyed by `(session, proof)` — never by the
//! proof value alone, which would misroute votes between concurrent
//! requests. A record collects one boolean vote per responding peer and is
//! resolved exactly once: by strict majority when the expected count is
//! reached, or by the caller's timeout. Either way the record is discarded
//! and late votes are ignored.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use rollcall_core::SessionId;

/// Outcome of a verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The claim was notarized.
    Confirmed,
    /// The claim could not be corroborated.
    Denied,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Confirmed => f.write_str("confirmed"),
            Verdict::Denied => f.write_str("denied"),
        }
    }
}

/// Key for an in-flight verification request.
pub type VoteKey = (SessionId, String);

/// What happened when a vote arrived.
#[derive(Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Vote recorded; more are expected.
    Awaiting { have: usize, expected: usize },
    /// The vote completed the set and the request was decided.
    Decided(Verdict),
    /// No pending request matched (late or unsolicited vote).
    Unmatched,
}

struct PendingRequest {
    votes: Vec<bool>,
    expected: usize,
    waiters: Vec<oneshot::Sender<Verdict>>,
}

/// Tracker for pending verification requests.
#[derive(Default)]
pub struct Verifier {
    pending: Mutex<HashMap<VoteKey, PendingRequest>>,
}

impl Verifier {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in a verification request.
    ///
    /// The returned receiver resolves exactly once when the request is
    /// decided. If a request with the same key is already in flight, the
    /// caller shares its record instead of starting a second poll.
    pub fn register(&self, key: VoteKey, expected: usize) -> oneshot::Receiver<Verdict> {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock().unwrap();

        match pending.entry(key) {
            Entry::Occupied(mut occupied) => {
                occupied.get_mut().waiters.push(tx);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(PendingRequest {
                    votes: Vec::new(),
                    expected,
                    waiters: vec![tx],
                });
            }
        }

        rx
    }

    /// Record one peer's vote.
    ///
    /// When the expected count is reached the request is decided, every
    /// waiter is notified, and the record is discarded.
    pub fn record_vote(&self, key: &VoteKey, vote: bool) -> VoteOutcome {
        let mut pending = self.pending.lock().unwrap();

        let Some(request) = pending.get_mut(key) else {
            return VoteOutcome::Unmatched;
        };

        request.votes.push(vote);
        if request.votes.len() < request.expected {
            return VoteOutcome::Awaiting {
                have: request.votes.len(),
                expected: request.expected,
            };
        }

        let request = pending.remove(key).expect("record present");
        let verdict = decide(&request.votes);
        for waiter in request.waiters {
            let _ = waiter.send(verdict);
        }
        VoteOutcome::Decided(verdict)
    }

    /// Drop a pending request (timeout path).
    ///
    /// Remaining waiters observe their dropped handle and resolve as
    /// denied; votes arriving afterwards are unmatched.
    pub fn discard(&self, key: &VoteKey) -> bool {
        self.pending.lock().unwrap().remove(key).is_some()
    }

    /// Number of requests currently awaiting votes.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

/// Strict majority: confirmed iff more than half the votes are true.
fn decide(votes: &[bool]) -> Verdict {
    let confirmations = votes.iter().filter(|v| **v).count();
    if confirmations * 2 > votes.len() {
        Verdict::Confirmed
    } else {
        Verdict::Denied
    }
}

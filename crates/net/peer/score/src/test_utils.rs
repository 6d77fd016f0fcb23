//! Shared fixtures for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use libp2p::PeerId;
use parking_lot::Mutex;

use crate::gate::{ConnectionGate, GateError, MemoryConnectionGate};
use crate::sink::ScoringMetricer;
use crate::traits::NetPeerId;

pub(crate) fn test_peer_id(n: u8) -> PeerId {
    let bytes = [n; 32];
    let key = libp2p::identity::ed25519::SecretKey::try_from_bytes(bytes).unwrap();
    let keypair = libp2p::identity::Keypair::from(libp2p::identity::ed25519::Keypair::from(key));
    keypair.public().to_peer_id()
}

/// Records every metric call in order.
#[derive(Debug)]
pub(crate) struct RecordingMetricer<Id> {
    pub(crate) records: Mutex<Vec<(Id, f64)>>,
}

impl<Id> Default for RecordingMetricer<Id> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }
}

impl<Id: NetPeerId> RecordingMetricer<Id> {
    pub(crate) fn records(&self) -> Vec<(Id, f64)> {
        self.records.lock().clone()
    }
}

impl<Id: NetPeerId> ScoringMetricer<Id> for RecordingMetricer<Id> {
    fn record_peer_scoring(&self, peer: &Id, score: f64) {
        self.records.lock().push((peer.clone(), score));
    }
}

/// A gate call observed by [`FlakyGate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum GateCall<Id> {
    Block(Id),
    Unblock(Id),
}

/// Memory gate that logs calls and fails for selected peers.
#[derive(Debug)]
pub(crate) struct FlakyGate<Id: NetPeerId> {
    pub(crate) inner: MemoryConnectionGate<Id>,
    pub(crate) failing: Mutex<HashSet<Id>>,
    pub(crate) calls: Mutex<Vec<GateCall<Id>>>,
    /// `is_blocked` and `list_blocked_peers` calls.
    pub(crate) state_queries: AtomicUsize,
}

impl<Id: NetPeerId> Default for FlakyGate<Id> {
    fn default() -> Self {
        Self {
            inner: MemoryConnectionGate::new(),
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            state_queries: AtomicUsize::new(0),
        }
    }
}

impl<Id: NetPeerId> FlakyGate<Id> {
    pub(crate) fn fail_for(&self, peer: Id) {
        self.failing.lock().insert(peer);
    }

    pub(crate) fn calls(&self) -> Vec<GateCall<Id>> {
        self.calls.lock().clone()
    }

    pub(crate) fn state_queries(&self) -> usize {
        self.state_queries.load(Ordering::SeqCst)
    }

    fn check(&self, peer: &Id) -> Result<(), GateError> {
        if self.failing.lock().contains(peer) {
            return Err(GateError::Unavailable("store offline".into()));
        }
        Ok(())
    }
}

impl<Id: NetPeerId> ConnectionGate<Id> for FlakyGate<Id> {
    fn block_peer(&self, peer: &Id) -> Result<(), GateError> {
        self.calls.lock().push(GateCall::Block(peer.clone()));
        self.check(peer)?;
        self.inner.block_peer(peer)
    }

    fn unblock_peer(&self, peer: &Id) -> Result<(), GateError> {
        self.calls.lock().push(GateCall::Unblock(peer.clone()));
        self.check(peer)?;
        self.inner.unblock_peer(peer)
    }

    fn list_blocked_peers(&self) -> Vec<Id> {
        self.state_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.list_blocked_peers()
    }

    fn is_blocked(&self, peer: &Id) -> bool {
        self.state_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.is_blocked(peer)
    }
}

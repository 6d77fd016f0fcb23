//! Connection gate: the authoritative block list for the gossip swarm.

use std::collections::HashSet;

use auto_impl::auto_impl;
use libp2p::PeerId;
use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::traits::NetPeerId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("peer {peer} is protected and cannot be blocked")]
    Protected { peer: String },
    #[error("connection gate unavailable: {0}")]
    Unavailable(String),
}

/// Connection Gate
///
/// Owns the set of peers that may not communicate with the local node. The
/// scorer only ever issues idempotent commands against it and reads its live
/// state; implementations must be safe for concurrent use.
#[auto_impl(&, Box, Arc)]
pub trait ConnectionGate<Id: NetPeerId = PeerId>: Send + Sync {
    /// Blocks a peer. Blocking an already-blocked peer succeeds.
    fn block_peer(&self, peer: &Id) -> Result<(), GateError>;

    /// Unblocks a peer. Unblocking a peer that is not blocked succeeds.
    fn unblock_peer(&self, peer: &Id) -> Result<(), GateError>;

    /// Lists the blocked peers as of the time of the call.
    fn list_blocked_peers(&self) -> Vec<Id>;

    fn is_blocked(&self, peer: &Id) -> bool {
        self.list_blocked_peers().contains(peer)
    }
}

/// In-memory gate with `RwLock`-protected block and protection sets.
///
/// Protected peers are exempt from blocking, mirroring static or trusted peers
/// that scoring must never cut off.
#[derive(Debug)]
pub struct MemoryConnectionGate<Id: NetPeerId = PeerId> {
    blocked: RwLock<HashSet<Id>>,
    protected: RwLock<HashSet<Id>>,
}

impl<Id: NetPeerId> Default for MemoryConnectionGate<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: NetPeerId> MemoryConnectionGate<Id> {
    pub fn new() -> Self {
        Self {
            blocked: RwLock::new(HashSet::new()),
            protected: RwLock::new(HashSet::new()),
        }
    }

    /// Protects a peer from being blocked.
    pub fn protect_peer(&self, peer: Id) {
        debug!(?peer, "protected peer");
        self.protected.write().insert(peer);
    }

    pub fn unprotect_peer(&self, peer: &Id) {
        if self.protected.write().remove(peer) {
            debug!(?peer, "unprotected peer");
        }
    }

    pub fn is_protected(&self, peer: &Id) -> bool {
        self.protected.read().contains(peer)
    }

    pub fn list_protected_peers(&self) -> Vec<Id> {
        self.protected.read().iter().cloned().collect()
    }

    pub fn blocked_count(&self) -> usize {
        self.blocked.read().len()
    }
}

impl<Id: NetPeerId> ConnectionGate<Id> for MemoryConnectionGate<Id> {
    fn block_peer(&self, peer: &Id) -> Result<(), GateError> {
        // Holding the protected read lock keeps protect/block from interleaving.
        let protected = self.protected.read();
        if protected.contains(peer) {
            return Err(GateError::Protected {
                peer: format!("{peer:?}"),
            });
        }
        if self.blocked.write().insert(peer.clone()) {
            debug!(?peer, "blocked peer");
        }
        Ok(())
    }

    fn unblock_peer(&self, peer: &Id) -> Result<(), GateError> {
        if self.blocked.write().remove(peer) {
            debug!(?peer, "unblocked peer");
        }
        Ok(())
    }

    fn list_blocked_peers(&self) -> Vec<Id> {
        self.blocked.read().iter().cloned().collect()
    }

    fn is_blocked(&self, peer: &Id) -> bool {
        self.blocked.read().contains(peer)
    }
}

//! Read-only access to peer metadata held outside this crate.

use auto_impl::auto_impl;
use libp2p::{Multiaddr, PeerId};

use crate::traits::NetPeerId;

/// Peer address book consulted for context when a peer is blocked.
#[auto_impl(&, Box, Arc)]
pub trait PeerDirectory<Id: NetPeerId = PeerId>: Send + Sync {
    /// Known addresses for a peer; empty when the peer is unknown.
    fn addresses(&self, peer: &Id) -> Vec<Multiaddr>;
}

//! Peer identifier bound shared by every component.

use std::fmt::Debug;
use std::hash::Hash;

/// Blanket-implemented for any type with Clone + Eq + Hash + Send + Sync + Debug.
///
/// `libp2p::PeerId` is the default identifier throughout the crate; tests and
/// embedders may use any other key type.
pub trait NetPeerId: Clone + Eq + Hash + Send + Sync + Debug + 'static {}

impl<T> NetPeerId for T where T: Clone + Eq + Hash + Send + Sync + Debug + 'static {}

//! Point-in-time view of peer scores handed over by the scoring engine.

use std::collections::HashMap;
use std::collections::hash_map;

use libp2p::PeerId;

use crate::traits::NetPeerId;

/// Immutable mapping of peer to score at a single instant.
///
/// Built once by the adapter in front of the gossip engine and read by the
/// scorer. There is no way to mutate a snapshot after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSnapshot<Id: NetPeerId = PeerId> {
    scores: HashMap<Id, f64>,
}

impl<Id: NetPeerId> Default for ScoreSnapshot<Id> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<Id: NetPeerId> ScoreSnapshot<Id> {
    pub fn empty() -> Self {
        Self {
            scores: HashMap::new(),
        }
    }

    /// Consuming builder used by adapters and tests.
    pub fn with(mut self, peer: Id, score: f64) -> Self {
        self.scores.insert(peer, score);
        self
    }

    pub fn get(&self, peer: &Id) -> Option<f64> {
        self.scores.get(peer).copied()
    }

    pub fn contains(&self, peer: &Id) -> bool {
        self.scores.contains_key(peer)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn peers(&self) -> impl Iterator<Item = &Id> {
        self.scores.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Id, f64)> {
        self.scores.iter().map(|(id, score)| (id, *score))
    }
}

impl<Id: NetPeerId> From<HashMap<Id, f64>> for ScoreSnapshot<Id> {
    fn from(scores: HashMap<Id, f64>) -> Self {
        Self { scores }
    }
}

impl<Id: NetPeerId> FromIterator<(Id, f64)> for ScoreSnapshot<Id> {
    fn from_iter<I: IntoIterator<Item = (Id, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

impl<Id: NetPeerId> IntoIterator for ScoreSnapshot<Id> {
    type Item = (Id, f64);
    type IntoIter = hash_map::IntoIter<Id, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.scores.into_iter()
    }
}

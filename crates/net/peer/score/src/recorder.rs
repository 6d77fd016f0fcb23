//! Per-peer connection churn accounting.
//!
//! The network layer calls [`PeerEventRecorder::on_connect`] and
//! [`PeerEventRecorder::on_disconnect`] from its connection notifier, possibly
//! from many tasks at once. Counters live in `Arc`-wrapped atomics inside a
//! sharded map, so unrelated peers never contend on a common lock and an
//! existing peer is updated under a shard read lock only.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use libp2p::PeerId;
use tracing::{debug, trace};

use crate::traits::NetPeerId;

const ORD: Ordering = Ordering::Relaxed;

/// Entries examined when choosing an eviction victim.
pub const EVICTION_SAMPLE: usize = 16;

/// Point-in-time copy of a peer's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionCounters {
    pub connections: u64,
    pub disconnections: u64,
}

#[derive(Debug, Default)]
struct PeerCounters {
    connections: AtomicU64,
    disconnections: AtomicU64,
    /// Logical time of the last event, used for eviction.
    last_touched: AtomicU64,
}

impl PeerCounters {
    fn snapshot(&self) -> ConnectionCounters {
        ConnectionCounters {
            connections: self.connections.load(ORD),
            disconnections: self.disconnections.load(ORD),
        }
    }
}

/// Accumulates connect/disconnect counts per peer.
///
/// Entries are created lazily on the first event for a peer. With
/// `max_tracked_peers` set, making room for a new peer evicts the least
/// recently touched of at most [`EVICTION_SAMPLE`] entries, so the victim is
/// approximately LRU and the cost is independent of the map size. Under
/// concurrent inserts the bound may be exceeded by the number of racing
/// callers.
#[derive(Debug)]
pub struct PeerEventRecorder<Id: NetPeerId = PeerId> {
    peers: DashMap<Id, Arc<PeerCounters>>,
    max_tracked_peers: Option<usize>,
    clock: AtomicU64,
}

impl<Id: NetPeerId> Default for PeerEventRecorder<Id> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Id: NetPeerId> PeerEventRecorder<Id> {
    pub fn new() -> Self {
        Self {
            peers: DashMap::new(),
            max_tracked_peers: None,
            clock: AtomicU64::new(0),
        }
    }

    /// Recorder that keeps at most `max` peers (approximately, see type docs).
    pub fn bounded(max: usize) -> Self {
        Self {
            max_tracked_peers: Some(max.max(1)),
            ..Self::new()
        }
    }

    pub fn with_capacity(max_tracked_peers: Option<usize>) -> Self {
        match max_tracked_peers {
            Some(max) => Self::bounded(max),
            None => Self::new(),
        }
    }

    pub fn max_tracked_peers(&self) -> Option<usize> {
        self.max_tracked_peers
    }

    /// Records that a session with `peer` opened.
    pub fn on_connect(&self, peer: &Id) {
        let counters = self.counters_for(peer);
        let connections = counters.connections.fetch_add(1, ORD) + 1;
        counters.last_touched.store(self.tick(), ORD);
        trace!(?peer, connections, "recorded peer connection");
    }

    /// Records that a session with `peer` closed.
    ///
    /// A peer never seen connecting gets a fresh record.
    pub fn on_disconnect(&self, peer: &Id) {
        let counters = self.counters_for(peer);
        let disconnections = counters.disconnections.fetch_add(1, ORD) + 1;
        counters.last_touched.store(self.tick(), ORD);
        trace!(?peer, disconnections, "recorded peer disconnection");
    }

    pub fn counters(&self, peer: &Id) -> Option<ConnectionCounters> {
        self.peers.get(peer).map(|entry| entry.value().snapshot())
    }

    pub fn connections(&self, peer: &Id) -> u64 {
        self.counters(peer).map(|c| c.connections).unwrap_or(0)
    }

    pub fn disconnections(&self, peer: &Id) -> u64 {
        self.counters(peer).map(|c| c.disconnections).unwrap_or(0)
    }

    /// Score adjustment for a peer's churn: `connections * factor`.
    pub fn churn_penalty(&self, peer: &Id, factor: f64) -> f64 {
        self.connections(peer) as f64 * factor
    }

    pub fn tracked_peers(&self) -> usize {
        self.peers.len()
    }

    pub fn contains(&self, peer: &Id) -> bool {
        self.peers.contains_key(peer)
    }

    /// Forgets a peer's history.
    pub fn reset(&self, peer: &Id) {
        if self.peers.remove(peer).is_some() {
            debug!(?peer, "reset peer connection counters");
        }
    }

    pub fn clear(&self) {
        self.peers.clear();
    }

    /// Next logical time; never zero.
    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, ORD) + 1
    }

    fn counters_for(&self, peer: &Id) -> Arc<PeerCounters> {
        // Fast path: shard read lock
        if let Some(entry) = self.peers.get(peer) {
            return Arc::clone(entry.value());
        }

        if let Some(max) = self.max_tracked_peers
            && self.peers.len() >= max
        {
            self.evict_one();
        }

        let entry = self.peers.entry(peer.clone()).or_insert_with(|| {
            trace!(?peer, "tracking new peer");
            // Stamped before it becomes visible to evictors.
            Arc::new(PeerCounters {
                last_touched: AtomicU64::new(self.tick()),
                ..Default::default()
            })
        });
        Arc::clone(entry.value())
    }

    fn evict_one(&self) {
        if let Some(peer) = self.eviction_candidate() {
            self.peers.remove(&peer);
            debug!(?peer, "evicted least recently active peer from recorder");
        }
    }

    /// Oldest entry among the first [`EVICTION_SAMPLE`] yielded by the map.
    fn eviction_candidate(&self) -> Option<Id> {
        self.peers
            .iter()
            .take(EVICTION_SAMPLE)
            .min_by_key(|entry| entry.value().last_touched.load(ORD))
            .map(|entry| entry.key().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Barrier;
    use std::thread;

    use super::*;

    #[test]
    fn test_connect_disconnect_counts() {
        let recorder = PeerEventRecorder::<u64>::new();

        recorder.on_connect(&1);
        recorder.on_connect(&1);
        recorder.on_disconnect(&1);

        assert_eq!(
            recorder.counters(&1),
            Some(ConnectionCounters {
                connections: 2,
                disconnections: 1
            })
        );
        assert_eq!(recorder.connections(&2), 0);
        assert_eq!(recorder.counters(&2), None);
    }

    #[test]
    fn test_disconnect_for_unknown_peer_creates_record() {
        let recorder = PeerEventRecorder::<u64>::new();

        recorder.on_disconnect(&9);

        assert!(recorder.contains(&9));
        assert_eq!(recorder.disconnections(&9), 1);
        assert_eq!(recorder.connections(&9), 0);
    }

    #[test]
    fn test_churn_penalty() {
        let recorder = PeerEventRecorder::<u64>::new();
        for _ in 0..3 {
            recorder.on_connect(&1);
            recorder.on_disconnect(&1);
        }

        assert_eq!(recorder.churn_penalty(&1, -10.0), -30.0);
        assert_eq!(recorder.churn_penalty(&2, -10.0), 0.0);
    }

    #[test]
    fn test_reset_and_clear() {
        let recorder = PeerEventRecorder::<u64>::new();
        recorder.on_connect(&1);
        recorder.on_connect(&2);

        recorder.reset(&1);
        assert!(!recorder.contains(&1));
        assert_eq!(recorder.tracked_peers(), 1);

        // Counting restarts from zero after a reset.
        recorder.on_connect(&1);
        assert_eq!(recorder.connections(&1), 1);

        recorder.clear();
        assert_eq!(recorder.tracked_peers(), 0);
    }

    #[test]
    fn test_bounded_evicts_least_recently_touched() {
        let recorder = PeerEventRecorder::<u64>::bounded(2);

        recorder.on_connect(&1);
        recorder.on_connect(&2);
        // Touch 1 again so 2 becomes the oldest.
        recorder.on_disconnect(&1);

        recorder.on_connect(&3);

        assert_eq!(recorder.tracked_peers(), 2);
        assert!(recorder.contains(&1));
        assert!(!recorder.contains(&2));
        assert!(recorder.contains(&3));
    }

    #[test]
    fn test_bounded_existing_peer_does_not_evict() {
        let recorder = PeerEventRecorder::<u64>::bounded(2);
        recorder.on_connect(&1);
        recorder.on_connect(&2);

        for _ in 0..10 {
            recorder.on_connect(&2);
        }

        assert!(recorder.contains(&1));
        assert_eq!(recorder.connections(&2), 11);
    }

    #[test]
    fn test_new_entry_is_stamped_on_insert() {
        let recorder = PeerEventRecorder::<u64>::bounded(4);
        recorder.on_connect(&1);

        // The entry is visible with a fresh timestamp before any counter moves.
        let counters = recorder.counters_for(&2);
        assert_eq!(counters.connections.load(ORD), 0);
        assert!(counters.last_touched.load(ORD) > 0);
        let first = recorder.peers.get(&1).map(|e| e.last_touched.load(ORD));
        assert!(Some(counters.last_touched.load(ORD)) > first);
    }

    #[test]
    fn test_eviction_only_examines_a_bounded_sample() {
        const PEERS: u64 = 1_000;
        let recorder = PeerEventRecorder::<u64>::bounded(PEERS as usize);
        for peer in 0..PEERS {
            recorder.on_connect(&peer);
        }

        let sampled: HashSet<u64> = recorder
            .peers
            .iter()
            .take(EVICTION_SAMPLE)
            .map(|entry| *entry.key())
            .collect();
        let outside = (0..PEERS).find(|peer| !sampled.contains(peer)).unwrap();
        // Globally oldest entry, but outside the sampled window.
        recorder
            .peers
            .get(&outside)
            .unwrap()
            .last_touched
            .store(0, ORD);

        let victim = recorder.eviction_candidate().unwrap();
        assert!(sampled.contains(&victim));
        assert_ne!(victim, outside);
    }

    #[test]
    fn test_concurrent_inserts_keep_fresh_peers() {
        const OLD: u64 = 64;
        const THREADS: u64 = 8;

        for _ in 0..50 {
            let recorder = Arc::new(PeerEventRecorder::<u64>::bounded(OLD as usize));
            for peer in 0..OLD {
                recorder.on_connect(&peer);
            }

            let barrier = Arc::new(Barrier::new(THREADS as usize));
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let recorder = Arc::clone(&recorder);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        recorder.on_connect(&(OLD + i));
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            for i in 0..THREADS {
                assert_eq!(recorder.connections(&(OLD + i)), 1);
            }
        }
    }

    #[test]
    fn test_concurrent_distinct_peers_exact_counts() {
        const THREADS: u64 = 8;
        const PEERS: u64 = 16;
        const ROUNDS: u64 = 250;

        let recorder = Arc::new(PeerEventRecorder::<u64>::new());
        let mut handles = vec![];

        for _ in 0..THREADS {
            let recorder = Arc::clone(&recorder);
            handles.push(thread::spawn(move || {
                for _ in 0..ROUNDS {
                    for peer in 0..PEERS {
                        recorder.on_connect(&peer);
                        if peer % 2 == 0 {
                            recorder.on_disconnect(&peer);
                        }
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(recorder.tracked_peers(), PEERS as usize);
        for peer in 0..PEERS {
            let counters = recorder.counters(&peer).unwrap();
            assert_eq!(counters.connections, THREADS * ROUNDS);
            let expected = if peer % 2 == 0 { THREADS * ROUNDS } else { 0 };
            assert_eq!(counters.disconnections, expected);
        }
    }

    #[test]
    fn test_counters_are_monotonic() {
        let recorder = PeerEventRecorder::<u64>::new();
        let mut last = ConnectionCounters::default();

        for i in 0..50 {
            if i % 3 == 0 {
                recorder.on_disconnect(&1);
            } else {
                recorder.on_connect(&1);
            }
            let now = recorder.counters(&1).unwrap();
            assert!(now.connections >= last.connections);
            assert!(now.disconnections >= last.disconnections);
            last = now;
        }
    }
}

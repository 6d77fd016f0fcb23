//! Metrics sink for peer scores and counters for scorer outcomes.

use std::sync::atomic::{AtomicU64, Ordering};

use auto_impl::auto_impl;
use libp2p::PeerId;
use metrics::Counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::traits::NetPeerId;

/// Consumer of per-peer scores.
///
/// Calls are fire-and-forget: nothing is returned and the scorer never waits on
/// the outcome. Sinks that may be slow should sit behind a [`QueuedMetricer`].
#[auto_impl(&, Box, Arc)]
pub trait ScoringMetricer<Id: NetPeerId = PeerId>: Send + Sync {
    fn record_peer_scoring(&self, peer: &Id, score: f64);
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricer;

impl<Id: NetPeerId> ScoringMetricer<Id> for NoopMetricer {
    fn record_peer_scoring(&self, _peer: &Id, _score: f64) {}
}

/// Publishes scores through the `metrics` facade.
///
/// Only the score distribution is exported. Peer ids are not used as labels:
/// the exporter never drops a series, so per-peer series would grow with
/// every peer ever seen.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusMetricer;

impl<Id: NetPeerId> ScoringMetricer<Id> for PrometheusMetricer {
    fn record_peer_scoring(&self, _peer: &Id, score: f64) {
        metrics::histogram!("p2p.peer_score_distribution").record(score);
    }
}

/// Counters describing what the scorer did.
#[derive(Clone, Debug)]
pub struct ScorerMetrics {
    pub(crate) evaluations_total: Counter,
    pub(crate) peers_scored_total: Counter,
    pub(crate) blocks_total: Counter,
    pub(crate) unblocks_total: Counter,
    pub(crate) block_failures_total: Counter,
    pub(crate) unblock_failures_total: Counter,
}

impl Default for ScorerMetrics {
    fn default() -> Self {
        Self {
            evaluations_total: metrics::counter!("p2p.scorer.evaluations_total"),
            peers_scored_total: metrics::counter!("p2p.scorer.peers_scored_total"),
            blocks_total: metrics::counter!("p2p.scorer.blocks_total"),
            unblocks_total: metrics::counter!("p2p.scorer.unblocks_total"),
            block_failures_total: metrics::counter!(
                "p2p.scorer.gate_failures_total",
                "op" => "block"
            ),
            unblock_failures_total: metrics::counter!(
                "p2p.scorer.gate_failures_total",
                "op" => "unblock"
            ),
        }
    }
}

/// Decouples the scorer from a slow or stuck sink.
///
/// Records go into a bounded channel drained on a dedicated blocking thread.
/// A full queue drops the record and counts it; the caller never waits.
#[derive(Debug)]
pub struct QueuedMetricer<Id: NetPeerId = PeerId> {
    tx: mpsc::Sender<(Id, f64)>,
    dropped: AtomicU64,
    dropped_total: Counter,
}

impl<Id: NetPeerId> QueuedMetricer<Id> {
    /// Starts the forwarding thread. Must be called within a tokio runtime.
    ///
    /// The returned handle completes once every clone of the sender is gone,
    /// i.e. after the `QueuedMetricer` is dropped and the queue is drained.
    pub fn spawn<M>(inner: M, capacity: usize) -> (Self, JoinHandle<()>)
    where
        M: ScoringMetricer<Id> + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<(Id, f64)>(capacity.max(1));
        let handle = tokio::task::spawn_blocking(move || {
            while let Some((peer, score)) = rx.blocking_recv() {
                inner.record_peer_scoring(&peer, score);
            }
            trace!("metrics queue closed");
        });

        let metricer = Self {
            tx,
            dropped: AtomicU64::new(0),
            dropped_total: metrics::counter!("p2p.scorer.metrics_dropped_total"),
        };
        (metricer, handle)
    }

    /// Records dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<Id: NetPeerId> ScoringMetricer<Id> for QueuedMetricer<Id> {
    fn record_peer_scoring(&self, peer: &Id, score: f64) {
        if self.tx.try_send((peer.clone(), score)).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            self.dropped_total.increment(1);
        }
    }
}

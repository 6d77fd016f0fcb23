//! Score evaluator: turns score snapshots into block and unblock decisions.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use libp2p::PeerId;
use tracing::{debug, trace, warn};

use crate::config::{ChurnPolicy, ScoreConfig};
use crate::directory::PeerDirectory;
use crate::gate::ConnectionGate;
use crate::recorder::PeerEventRecorder;
use crate::sink::{ScorerMetrics, ScoringMetricer};
use crate::snapshot::ScoreSnapshot;
use crate::traits::NetPeerId;

const ORD: Ordering = Ordering::Relaxed;

/// Cumulative counters of scorer activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScorerStats {
    pub evaluations: u64,
    pub peers_scored: u64,
    /// Successful block calls, including ones for already-blocked peers.
    pub blocks: u64,
    pub unblocks: u64,
    pub block_failures: u64,
    pub unblock_failures: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
    evaluations: AtomicU64,
    peers_scored: AtomicU64,
    blocks: AtomicU64,
    unblocks: AtomicU64,
    block_failures: AtomicU64,
    unblock_failures: AtomicU64,
}

/// Threshold policy over gossip score snapshots.
///
/// For each peer in a snapshot the score is reported to the metrics sink, then:
/// - score below `block_threshold`: the peer is blocked
/// - score above `block_threshold` and the gate reports it blocked: unblocked
/// - score exactly on the threshold (or NaN): nothing happens
///
/// Gate failures are logged and counted but never abort the snapshot; the
/// next inspection retries naturally. The scorer holds no block-list state of
/// its own, so concurrent evaluations only ever race on idempotent gate calls.
pub struct PeerScorer<Id: NetPeerId = PeerId> {
    config: ScoreConfig,
    gate: Arc<dyn ConnectionGate<Id>>,
    metricer: Arc<dyn ScoringMetricer<Id>>,
    recorder: Option<Arc<PeerEventRecorder<Id>>>,
    directory: Option<Arc<dyn PeerDirectory<Id>>>,
    stats: StatCounters,
    metrics: ScorerMetrics,
}

impl<Id: NetPeerId> std::fmt::Debug for PeerScorer<Id> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerScorer")
            .field("config", &self.config)
            .field("has_recorder", &self.recorder.is_some())
            .field("has_directory", &self.directory.is_some())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl<Id: NetPeerId> PeerScorer<Id> {
    pub fn new(
        config: ScoreConfig,
        gate: Arc<dyn ConnectionGate<Id>>,
        metricer: Arc<dyn ScoringMetricer<Id>>,
    ) -> Self {
        Self {
            config,
            gate,
            metricer,
            recorder: None,
            directory: None,
            stats: StatCounters::default(),
            metrics: ScorerMetrics::default(),
        }
    }

    /// Attach the recorder whose counters feed [`ChurnPolicy::Penalize`].
    pub fn with_recorder(mut self, recorder: Arc<PeerEventRecorder<Id>>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Attach a directory used to annotate block decisions with addresses.
    pub fn with_directory(mut self, directory: Arc<dyn PeerDirectory<Id>>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn config(&self) -> &ScoreConfig {
        &self.config
    }

    pub fn recorder(&self) -> Option<&Arc<PeerEventRecorder<Id>>> {
        self.recorder.as_ref()
    }

    /// Current block list, read live from the gate.
    pub fn blocked_peers(&self) -> Vec<Id> {
        self.gate.list_blocked_peers()
    }

    pub fn stats(&self) -> ScorerStats {
        ScorerStats {
            evaluations: self.stats.evaluations.load(ORD),
            peers_scored: self.stats.peers_scored.load(ORD),
            blocks: self.stats.blocks.load(ORD),
            unblocks: self.stats.unblocks.load(ORD),
            block_failures: self.stats.block_failures.load(ORD),
            unblock_failures: self.stats.unblock_failures.load(ORD),
        }
    }

    /// Score compared against the threshold after applying the churn policy.
    pub fn effective_score(&self, peer: &Id, score: f64) -> f64 {
        match (self.config.churn_policy, &self.recorder) {
            (ChurnPolicy::Penalize, Some(recorder)) => {
                score + recorder.churn_penalty(peer, self.config.connection_factor)
            }
            _ => score,
        }
    }

    /// Applies the threshold policy to every peer in `snapshot`.
    pub fn evaluate(&self, snapshot: &ScoreSnapshot<Id>) {
        self.stats.evaluations.fetch_add(1, ORD);
        self.metrics.evaluations_total.increment(1);

        if snapshot.is_empty() {
            trace!("empty score snapshot");
            return;
        }

        let threshold = self.config.block_threshold;
        for (peer, reported) in snapshot.iter() {
            self.metricer.record_peer_scoring(peer, reported);

            let score = self.effective_score(peer, reported);
            if score < threshold {
                self.block(peer, score);
            } else if score > threshold && self.gate.is_blocked(peer) {
                self.unblock(peer, score);
            }
        }

        let scored = snapshot.len() as u64;
        self.stats.peers_scored.fetch_add(scored, ORD);
        self.metrics.peers_scored_total.increment(scored);
    }

    /// Closure suitable for registering as a gossip engine's inspection callback.
    pub fn snapshot_hook(self: &Arc<Self>) -> impl Fn(ScoreSnapshot<Id>) + Send + Sync + 'static {
        let scorer = Arc::clone(self);
        move |snapshot| scorer.evaluate(&snapshot)
    }

    fn block(&self, peer: &Id, score: f64) {
        match self.gate.block_peer(peer) {
            Ok(()) => {
                self.stats.blocks.fetch_add(1, ORD);
                self.metrics.blocks_total.increment(1);
                let addrs = self
                    .directory
                    .as_ref()
                    .map(|directory| directory.addresses(peer))
                    .unwrap_or_default();
                debug!(?peer, score, ?addrs, "blocked peer below score threshold");
            }
            Err(err) => {
                self.stats.block_failures.fetch_add(1, ORD);
                self.metrics.block_failures_total.increment(1);
                warn!(?peer, score, %err, "failed to block peer");
            }
        }
    }

    fn unblock(&self, peer: &Id, score: f64) {
        match self.gate.unblock_peer(peer) {
            Ok(()) => {
                self.stats.unblocks.fetch_add(1, ORD);
                self.metrics.unblocks_total.increment(1);
                debug!(?peer, score, "unblocked peer above score threshold");
            }
            Err(err) => {
                self.stats.unblock_failures.fetch_add(1, ORD);
                self.metrics.unblock_failures_total.increment(1);
                warn!(?peer, score, %err, "failed to unblock peer");
            }
        }
    }
}

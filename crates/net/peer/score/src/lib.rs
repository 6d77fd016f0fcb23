//! Threshold-based peer blocking driven by periodic gossip score snapshots.
//!
//! The scoring engine hands the [`PeerScorer`] a [`ScoreSnapshot`] on its own
//! schedule. Peers scoring below the block threshold are blocked through the
//! [`ConnectionGate`]; blocked peers scoring above it are unblocked. A score
//! exactly on the threshold leaves the peer as it is.
//!
//! Connection churn is tracked separately by the [`PeerEventRecorder`], which
//! the network layer drives from its connection notifications.
//!
//! # Usage
//!
//! ```ignore
//! let gate = Arc::new(MemoryConnectionGate::new());
//! let recorder = Arc::new(PeerEventRecorder::new());
//! let scorer = Arc::new(
//!     PeerScorer::new(ScoreConfig::default(), gate.clone(), Arc::new(PrometheusMetricer))
//!         .with_recorder(recorder.clone()),
//! );
//!
//! // network notifier
//! recorder.on_connect(&peer);
//!
//! // register with the gossip engine
//! let hook = scorer.snapshot_hook();
//! ```

mod config;
mod directory;
mod gate;
mod inspect;
mod recorder;
mod scorer;
mod sink;
mod snapshot;
mod traits;

pub use config::{
    ChurnPolicy, ConfigError, DEFAULT_BLOCK_THRESHOLD, DEFAULT_CONNECTION_FACTOR, ScoreConfig,
};
pub use directory::PeerDirectory;
pub use gate::{ConnectionGate, GateError, MemoryConnectionGate};
pub use inspect::{InspectionHandle, ScoreSource, spawn_inspection};
pub use recorder::{ConnectionCounters, EVICTION_SAMPLE, PeerEventRecorder};
pub use scorer::{PeerScorer, ScorerStats};
pub use sink::{
    NoopMetricer, PrometheusMetricer, QueuedMetricer, ScorerMetrics, ScoringMetricer,
};
pub use snapshot::ScoreSnapshot;
pub use traits::NetPeerId;

#[cfg(test)]
mod test_utils;

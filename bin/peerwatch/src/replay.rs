//! Offline replay of recorded score snapshots and connection events.
//!
//! The event log is JSON lines, one tagged event per line:
//!
//! ```text
//! {"type":"connected","peer":"12D3KooW..."}
//! {"type":"disconnected","peer":"12D3KooW..."}
//! {"type":"snapshot","scores":{"12D3KooW...":-120.5}}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use eyre::{Result, WrapErr};
use libp2p::PeerId;
use peerwatch_net_peer_score::{
    MemoryConnectionGate, PeerEventRecorder, PeerScorer, PrometheusMetricer,
    QueuedMetricer, ScoreSnapshot, ScorerStats,
};
use peerwatch_observability::install_prometheus_exporter;
use serde::Deserialize;
use tracing::{debug, info};

use crate::cli::ReplayArgs;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub(crate) enum ReplayEvent {
    Snapshot { scores: HashMap<PeerId, f64> },
    Connected { peer: PeerId },
    Disconnected { peer: PeerId },
}

#[derive(Debug, Default)]
pub(crate) struct ReplayReport {
    pub(crate) snapshots: usize,
    pub(crate) connection_events: usize,
    pub(crate) blocked: Vec<PeerId>,
    pub(crate) stats: ScorerStats,
}

pub(crate) fn parse_events(reader: impl BufRead) -> Result<Vec<ReplayEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.wrap_err_with(|| format!("failed to read event log line {line_no}"))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(line)
            .wrap_err_with(|| format!("invalid event on line {line_no}"))?;
        events.push(event);
    }
    Ok(events)
}

/// Feeds `events` in order: connection events go to `recorder`, snapshots to
/// the scorer's inspection hook.
pub(crate) fn replay(
    events: impl IntoIterator<Item = ReplayEvent>,
    scorer: &Arc<PeerScorer>,
    recorder: &PeerEventRecorder,
) -> ReplayReport {
    let hook = scorer.snapshot_hook();
    let mut report = ReplayReport::default();

    for event in events {
        match event {
            ReplayEvent::Connected { peer } => {
                recorder.on_connect(&peer);
                report.connection_events += 1;
            }
            ReplayEvent::Disconnected { peer } => {
                recorder.on_disconnect(&peer);
                report.connection_events += 1;
            }
            ReplayEvent::Snapshot { scores } => {
                debug!(peers = scores.len(), "replaying score snapshot");
                hook(ScoreSnapshot::from(scores));
                report.snapshots += 1;
            }
        }
    }

    let mut blocked = scorer.blocked_peers();
    blocked.sort_unstable_by_key(|peer| peer.to_base58());
    report.blocked = blocked;
    report.stats = scorer.stats();
    report
}

pub(crate) async fn run(args: ReplayArgs) -> Result<()> {
    let config = args.score.resolve().wrap_err("invalid scoring configuration")?;
    debug!(?config, "resolved scoring configuration");

    if let Some(addr) = args.metrics {
        install_prometheus_exporter(addr).wrap_err("failed to start metrics exporter")?;
    }

    let file = File::open(&args.events)
        .wrap_err_with(|| format!("failed to open event log {}", args.events.display()))?;
    let events = parse_events(BufReader::new(file))?;
    info!(events = events.len(), path = %args.events.display(), "loaded event log");

    let gate = Arc::new(MemoryConnectionGate::<PeerId>::new());
    for peer in args.protected {
        gate.protect_peer(peer);
    }

    let recorder = Arc::new(PeerEventRecorder::<PeerId>::with_capacity(
        config.max_tracked_peers,
    ));
    let (metricer, drain) =
        QueuedMetricer::<PeerId>::spawn(PrometheusMetricer, config.metrics_queue_capacity);
    let metricer = Arc::new(metricer);
    let scorer = Arc::new(
        PeerScorer::new(config, gate.clone(), metricer.clone())
            .with_recorder(Arc::clone(&recorder)),
    );

    let report = replay(events, &scorer, &recorder);
    let dropped = metricer.dropped();

    // Closing the last sender lets the drain thread finish.
    drop(metricer);
    drop(scorer);
    drain.await.wrap_err("metrics queue task failed")?;

    info!(
        snapshots = report.snapshots,
        connection_events = report.connection_events,
        blocks = report.stats.blocks,
        unblocks = report.stats.unblocks,
        gate_failures = report.stats.block_failures + report.stats.unblock_failures,
        dropped_metrics = dropped,
        tracked_peers = recorder.tracked_peers(),
        "replay finished"
    );

    println!("blocked peers: {}", report.blocked.len());
    for peer in &report.blocked {
        println!("{peer}");
    }
    Ok(())
}

//! Prometheus exporter for everything recorded through the `metrics` facade.

use std::net::SocketAddr;

use metrics::Unit;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use crate::ObservabilityError;

/// Installs the global recorder and serves `/metrics` on `addr`.
///
/// Must be called from within a tokio runtime.
pub fn install_prometheus_exporter(addr: SocketAddr) -> Result<(), ObservabilityError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe_scoring_metrics();
    info!(%addr, "serving prometheus metrics");
    Ok(())
}

/// Registers descriptions for the scorer's metrics with the installed recorder.
pub fn describe_scoring_metrics() {
    metrics::describe_histogram!(
        "p2p.peer_score_distribution",
        "Distribution of gossip scores across peers"
    );
    metrics::describe_counter!(
        "p2p.scorer.evaluations_total",
        Unit::Count,
        "Score snapshots evaluated"
    );
    metrics::describe_counter!(
        "p2p.scorer.peers_scored_total",
        Unit::Count,
        "Peer scores evaluated across all snapshots"
    );
    metrics::describe_counter!(
        "p2p.scorer.blocks_total",
        Unit::Count,
        "Block calls accepted by the connection gate"
    );
    metrics::describe_counter!(
        "p2p.scorer.unblocks_total",
        Unit::Count,
        "Unblock calls accepted by the connection gate"
    );
    metrics::describe_counter!(
        "p2p.scorer.gate_failures_total",
        Unit::Count,
        "Block or unblock calls rejected by the connection gate"
    );
    metrics::describe_counter!(
        "p2p.scorer.metrics_dropped_total",
        Unit::Count,
        "Score records dropped because the metrics queue was full"
    );
}

//! Logging and metrics export for peerwatch.

mod logging;
mod prometheus;

pub use logging::{LoggingConfig, init_logging};
pub use prometheus::{describe_scoring_metrics, install_prometheus_exporter};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("invalid log filter directive: {0}")]
    Directive(#[from] tracing_subscriber::filter::ParseError),
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
    #[error("failed to install prometheus exporter: {0}")]
    Exporter(#[from] metrics_exporter_prometheus::BuildError),
}

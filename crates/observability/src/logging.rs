//! Logging setup on top of `tracing-subscriber`.

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::ObservabilityError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Silence all output.
    pub quiet: bool,
    /// 0 = info, 1 = debug, 2+ = trace.
    pub verbosity: u8,
    /// Extra filter directives, e.g. `peerwatch_net_peer_score=trace`.
    pub filter: Option<String>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl LoggingConfig {
    pub fn level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::OFF;
        }
        match self.verbosity {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// `RUST_LOG` wins over the configured level; explicit directives are
    /// appended on top of either.
    pub fn env_filter(&self) -> Result<EnvFilter, ObservabilityError> {
        let base = EnvFilter::builder()
            .with_default_directive(self.level().into())
            .from_env_lossy();

        let Some(directives) = &self.filter else {
            return Ok(base);
        };

        directives
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .try_fold(base, |filter, directive| {
                Ok(filter.add_directive(directive.parse()?))
            })
    }
}

/// Installs the global subscriber. Fails if one is already set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ObservabilityError> {
    let filter = config.env_filter()?;

    let stdout_layer = fmt::layer().with_target(true);
    let stdout_layer = if config.json {
        stdout_layer.json().boxed()
    } else {
        stdout_layer.boxed()
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(filter)
        .try_init()?;

    Ok(())
}

//! Command line interface.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use libp2p::PeerId;
use peerwatch_net_peer_score::{ChurnPolicy, ConfigError, ScoreConfig};
use peerwatch_observability::LoggingConfig;

/// Peerwatch - gossip score based peer blocking
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logs: LogArgs,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Replay a recorded event log through the blocking policy.
    Replay(ReplayArgs),
    /// Print the effective scoring configuration as TOML.
    Config(ScoreArgs),
}

#[derive(Debug, Clone, Default, Args)]
#[command(next_help_heading = "Logging")]
pub(crate) struct LogArgs {
    /// Silence all output.
    #[arg(short, long)]
    pub(crate) quiet: bool,

    /// Verbose mode (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub(crate) verbosity: u8,

    /// Log filter directives (e.g. "peerwatch_net_peer_score=trace").
    #[arg(long, value_name = "DIRECTIVE")]
    pub(crate) filter: Option<String>,

    /// Use JSON format for log output.
    #[arg(long)]
    pub(crate) json: bool,
}

impl LogArgs {
    pub(crate) fn to_config(&self) -> LoggingConfig {
        LoggingConfig {
            quiet: self.quiet,
            verbosity: self.verbosity,
            filter: self.filter.clone(),
            json: self.json,
        }
    }
}

#[derive(Debug, Args)]
pub(crate) struct ReplayArgs {
    /// JSON lines file of snapshot and connection events.
    #[arg(long, value_name = "FILE")]
    pub(crate) events: PathBuf,

    /// Peer the gate must never block. May be repeated.
    #[arg(long = "protect", value_name = "PEER_ID")]
    pub(crate) protected: Vec<PeerId>,

    /// Serve prometheus metrics on this address while replaying.
    #[arg(long, value_name = "ADDR")]
    pub(crate) metrics: Option<SocketAddr>,

    #[command(flatten)]
    pub(crate) score: ScoreArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ChurnPolicyArg {
    Ignore,
    Penalize,
}

impl From<ChurnPolicyArg> for ChurnPolicy {
    fn from(arg: ChurnPolicyArg) -> Self {
        match arg {
            ChurnPolicyArg::Ignore => Self::Ignore,
            ChurnPolicyArg::Penalize => Self::Penalize,
        }
    }
}

/// Scoring configuration. Flags override values read from `--config`.
#[derive(Debug, Clone, Default, Args)]
#[command(next_help_heading = "Scoring")]
pub(crate) struct ScoreArgs {
    /// TOML file with scoring configuration.
    #[arg(long, value_name = "FILE", env = "PEERWATCH_CONFIG")]
    pub(crate) config: Option<PathBuf>,

    /// Scores strictly below this block the peer.
    #[arg(long = "score.block-threshold", value_name = "SCORE", allow_negative_numbers = true)]
    pub(crate) block_threshold: Option<f64>,

    /// Score delta per recorded connection when churn is penalized.
    #[arg(long = "score.connection-factor", value_name = "DELTA", allow_negative_numbers = true)]
    pub(crate) connection_factor: Option<f64>,

    /// Whether connection churn affects the compared score.
    #[arg(long = "score.churn-policy", value_enum)]
    pub(crate) churn_policy: Option<ChurnPolicyArg>,

    /// Upper bound on peers tracked by the connection recorder.
    #[arg(long = "score.max-tracked-peers", value_name = "COUNT")]
    pub(crate) max_tracked_peers: Option<usize>,
}

impl ScoreArgs {
    /// Loads `--config` (or defaults), applies flag overrides, then validates.
    pub(crate) fn resolve(&self) -> Result<ScoreConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ScoreConfig::load(path)?,
            None => ScoreConfig::default(),
        };

        if let Some(threshold) = self.block_threshold {
            config.block_threshold = threshold;
        }
        if let Some(factor) = self.connection_factor {
            config.connection_factor = factor;
        }
        if let Some(policy) = self.churn_policy {
            config.churn_policy = policy.into();
        }
        if let Some(max) = self.max_tracked_peers {
            config.max_tracked_peers = Some(max);
        }

        config.validate()?;
        Ok(config)
    }
}

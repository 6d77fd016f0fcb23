//! Peerwatch binary.

mod cli;
mod replay;

#[cfg(test)]
mod test_utils;

use clap::Parser;
use eyre::WrapErr;
use peerwatch_observability::init_logging;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli.logs.to_config()).wrap_err("failed to initialize logging")?;

    match cli.command {
        Commands::Replay(args) => replay::run(args).await,
        Commands::Config(args) => {
            let config = args
                .resolve()
                .wrap_err("invalid scoring configuration")?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

mod cli;
mod commands;

use clap::Parser;
use grabber_logging::LogDestination;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    let destination = match &cli.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Terminal,
    };
    grabber_logging::initialize(destination, cli.log_level());

    commands::execute(cli).await
}

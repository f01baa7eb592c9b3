mod activity;
mod agents;
mod cli;
mod client;
mod model;
mod orchestrator;
mod page;
mod server;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    cli::run(args).await
}

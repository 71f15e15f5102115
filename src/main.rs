mod api;
mod capture;
mod cli;
mod config;
mod gateway;
mod host;
mod protocol;
mod router;
mod server;
mod session;
mod store;
#[cfg(test)]
mod testutil;
mod verify;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli_args = cli::Cli::parse();
    match cli_args.command {
        Some(command) => cli::handle_cli_command(command).await,
        None => cli::run_serve(None).await,
    }
}

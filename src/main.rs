use anyhow::Result;
use clap::Parser;
use commerce_client::config::ClientConfig;
use log::{debug, info};

mod cli;

use cli::{Cli, Commands};
use cli::commands::{fetch_command, resolve_command, token_command};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();

    let cli = Cli::parse();
    info!("Starting commerce-client");

    let config = ClientConfig::resolve(cli.config.as_deref())?;
    let client = config.build_client()?;

    let cancel = client.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupt received, cancelling in-flight calls");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::Token(args) => token_command(args, &client).await,
        Commands::Fetch(args) => fetch_command(args, &client).await,
        Commands::Resolve(args) => resolve_command(args, &client).await,
    }
}

use super::commands::{FetchCommands, ResolveCommands, TokenCommands};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "commerce-client")]
#[command(about = "Resilient client for the commerce REST API")]
pub struct Cli {
    /// Config file to use instead of the environment or the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Refresh the access token and show its expiry
    Token(TokenCommands),
    /// Fetch a collection, all pages or a single one
    Fetch(FetchCommands),
    /// Resolve keys to identifiers by export or batched lookups
    Resolve(ResolveCommands),
}

use anyhow::{Context, Result};
use clap::Args;
use commerce_client::api::CommerceClient;
use log::info;

#[derive(Args)]
pub struct TokenCommands {
    /// Exchange the configured legacy developer credentials for a refresh token
    #[arg(long)]
    pub legacy: bool,
}

pub async fn token_command(args: TokenCommands, client: &CommerceClient) -> Result<()> {
    let credentials = client.credentials();

    if args.legacy {
        credentials
            .bootstrap_legacy()
            .await
            .context("Legacy token exchange failed")?;
    } else {
        credentials.refresh().await.context("Token refresh failed")?;
    }

    let state = credentials.snapshot();
    info!("Token endpoint called {} time(s)", credentials.token_requests());

    println!("🔑 Access token: {}", preview(&state.access_token));
    match state.access_token_expiry_utc {
        Some(expiry) => println!("   Expires: {}", expiry.to_rfc3339()),
        None => println!("   Expires: unknown"),
    }
    if args.legacy {
        if let Some(refresh_token) = &state.refresh_token {
            println!("   Refresh token: {}", refresh_token);
        }
    }
    Ok(())
}

fn preview(token: &str) -> String {
    let shown: String = token.chars().take(8).collect();
    format!("{}… ({} chars)", shown, token.chars().count())
}

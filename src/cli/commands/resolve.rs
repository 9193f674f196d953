use anyhow::{Context, Result, bail};
use clap::Args;
use commerce_client::api::CommerceClient;
use commerce_client::api::resilience::cooldown;
use log::warn;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct ResolveCommands {
    /// Resource name, e.g. `Products`
    pub resource: String,

    /// Field holding the lookup key
    #[arg(long, default_value = "Sku")]
    pub key_field: String,

    /// Field holding the identifier
    #[arg(long, default_value = "Id")]
    pub id_field: String,

    /// Read additional keys from a file, one per line
    #[arg(long)]
    pub keys_file: Option<PathBuf>,

    /// On hourly-quota throttling, sleep until the next hour and try once more
    #[arg(long)]
    pub wait_out_quota: bool,

    /// Keys to resolve
    pub keys: Vec<String>,
}

pub async fn resolve_command(args: ResolveCommands, client: &CommerceClient) -> Result<()> {
    let mut keys = args.keys.clone();
    if let Some(path) = &args.keys_file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read keys file: {}", path.display()))?;
        keys.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    if keys.is_empty() {
        bail!("No keys given; pass them as arguments or use --keys-file");
    }

    let resolved = match resolve(&args, client, &keys).await {
        Err(error) if args.wait_out_quota && error.is_throttled() => {
            warn!("Still throttled after retries: {}", error);
            cooldown::wait_out_hourly_quota(cooldown::DEFAULT_BUFFER, client.cancellation_token())
                .await?;
            resolve(&args, client, &keys).await?
        }
        other => other?,
    };

    let sorted: BTreeMap<_, _> = resolved.into_iter().collect();
    println!("{}", serde_json::to_string_pretty(&sorted)?);

    let missing = keys
        .iter()
        .filter(|k| !sorted.contains_key(&k.trim().to_lowercase()))
        .count();
    if missing > 0 {
        eprintln!("⚠️  {} key(s) not found", missing);
    }
    Ok(())
}

async fn resolve(
    args: &ResolveCommands,
    client: &CommerceClient,
    keys: &[String],
) -> commerce_client::api::ApiResult<HashMap<String, String>> {
    client
        .resolve_keys(&args.resource, &args.key_field, &args.id_field, keys)
        .await
}

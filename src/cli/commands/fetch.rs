use anyhow::{Context, Result};
use clap::Args;
use commerce_client::api::{CommerceClient, PagedResult};
use serde_json::{Value, json};

#[derive(Args)]
pub struct FetchCommands {
    /// Collection path relative to the API root, e.g. `Products?$select=Id,Sku`
    pub path: String,

    /// Page size used when the server does not recommend one
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Fetch only this page (1-based)
    #[arg(long)]
    pub page: Option<usize>,

    /// Print a summary instead of the items
    #[arg(long)]
    pub summary: bool,
}

pub async fn fetch_command(args: FetchCommands, client: &CommerceClient) -> Result<()> {
    let result: PagedResult<Value> = match args.page {
        Some(page) if page > 0 => client
            .fetch_page(&args.path, page, args.page_size)
            .await
            .with_context(|| format!("Failed to fetch page {} of {}", page, args.path))?,
        _ => client
            .fetch_all(&args.path, args.page_size)
            .await
            .with_context(|| format!("Failed to fetch {}", args.path))?,
    };

    if args.summary {
        println!("📦 {} item(s)", result.items.len());
        println!("   Final page: {}", result.final_page);
        println!("   All pages queried: {}", result.all_pages_queried);
        return Ok(());
    }

    let output = json!({
        "items": result.items,
        "final_page": result.final_page,
        "all_pages_queried": result.all_pages_queried,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

use std::sync::Arc;

use clap::Parser;
use server::{database::RedisStore, memory::MemoryStore, store::Store};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Path or http(s) URL of the seed JSON
    source: String,

    #[arg(long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    redis_url: String,

    /// Load into a throwaway in-memory store instead of Redis
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let file = seed::utils::read_source(&args.source).await?;
    println!("Loaded Categories: {}", file.categories.len());
    println!("Loaded Entries: {}\n", file.len());

    let store: Arc<dyn Store> = if args.dry_run {
        info!("Dry run, nothing will be written");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(RedisStore::connect(&args.redis_url).await?)
    };

    let pb = seed::utils::progress_bar(file.len())?;
    let summary = seed::load(store.as_ref(), &file, &pb).await?;

    println!("Inserted Categories: {}", summary.categories);
    println!("Inserted Items: {}", summary.items);
    println!("Skipped: {}", summary.skipped);

    Ok(())
}

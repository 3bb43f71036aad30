mod sample;
mod sync;

use catsync_client::{HttpClient, ProductFilter, SourceApi, TargetApi};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::sync::{SyncMode, Submission};

#[derive(Debug, Parser)]
#[command(name = "catsync")]
#[command(about = "Sync products and inventory from the source API into the target import API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch, normalize, and submit the product catalog (default)
    Sync {
        /// Print the import batch as JSON instead of submitting it
        #[arg(long)]
        dry_run: bool,
        /// Only sync this category (overrides `CATSYNC_CATEGORY`)
        #[arg(long)]
        category: Option<String>,
        /// Listing page size (overrides `CATSYNC_PAGE_SIZE`)
        #[arg(long)]
        page_size: Option<u32>,
    },
    /// Print raw source API responses to check the field mapping
    Sample {
        /// Product to fetch detail for; defaults to the first listed product
        #[arg(long)]
        product_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = catsync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // stdout is reserved for JSON output (`--dry-run`, `sample`).
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let http = HttpClient::from_app_config(&config)
        .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {e}"))?;
    let source = SourceApi::new(http.clone(), &config.source_base_url)
        .map_err(|e| anyhow::anyhow!("invalid CATSYNC_SOURCE_BASE_URL: {e}"))?;
    let mut filter = ProductFilter::from_app_config(&config);

    match cli.command {
        None => {
            let target = build_target(http, &config)?;
            run_sync_command(&source, &target, &config, &filter, SyncMode::Submit).await?;
        }
        Some(Commands::Sync {
            dry_run,
            category,
            page_size,
        }) => {
            if category.is_some() {
                filter.category = category;
            }
            if page_size.is_some() {
                filter.page_size = page_size;
            }
            let mode = if dry_run {
                SyncMode::DryRun
            } else {
                SyncMode::Submit
            };
            let target = build_target(http, &config)?;
            run_sync_command(&source, &target, &config, &filter, mode).await?;
        }
        Some(Commands::Sample { product_id }) => {
            sample::run_sample(&source, &filter, product_id.as_deref()).await?;
        }
    }

    Ok(())
}

/// The target key is only required once a command is about to submit.
pub(crate) fn build_target(
    http: HttpClient,
    config: &catsync_core::AppConfig,
) -> anyhow::Result<TargetApi> {
    let api_key = config.require_target_api_key()?;
    TargetApi::new(http, &config.target_base_url, api_key)
        .map_err(|e| anyhow::anyhow!("invalid CATSYNC_TARGET_BASE_URL: {e}"))
}

async fn run_sync_command(
    source: &SourceApi,
    target: &TargetApi,
    config: &catsync_core::AppConfig,
    filter: &ProductFilter,
    mode: SyncMode,
) -> anyhow::Result<()> {
    let report = sync::run_sync(source, target, config, filter, mode, chrono::Utc::now()).await;
    report.log_summary();

    if let Submission::DryRun(batch) = &report.submission {
        println!("{}", serde_json::to_string_pretty(batch)?);
    }
    Ok(())
}

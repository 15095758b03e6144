mod lookup;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nutrack-cli")]
#[command(about = "Resolve Open Food Facts barcodes and searches from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Look up a product by barcode and print the upstream JSON.
    Barcode {
        /// Product code, e.g. an EAN-13.
        code: String,
    },
    /// Search products by free text and print the ranked result JSON.
    Search {
        query: String,
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        page_size: Option<String>,
        /// Result language.
        #[arg(long)]
        lc: Option<String>,
        /// Country filter, e.g. `fr`.
        #[arg(long)]
        country: Option<String>,
        /// Ask upstream caches to be bypassed.
        #[arg(long)]
        fresh: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = nutrack_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let client = nutrack_off::OffClient::new(
        &config.off_mirrors,
        config.off_timeout_ms,
        &config.off_user_agent,
    )
    .map_err(|e| anyhow::anyhow!("failed to build Open Food Facts client: {e}"))?;

    let output = match cli.command {
        Commands::Barcode { code } => lookup::run_barcode(&client, &code).await?,
        Commands::Search {
            query,
            page,
            page_size,
            lc,
            country,
            fresh,
        } => {
            let raw = nutrack_off::RawSearchParams {
                q: Some(query.as_str()),
                page: page.as_deref(),
                page_size: page_size.as_deref(),
                lc: lc.as_deref(),
                country: country.as_deref(),
                fresh: fresh.then_some("1"),
            };
            lookup::run_search(&client, &raw).await?
        }
    };

    println!("{output}");
    Ok(())
}

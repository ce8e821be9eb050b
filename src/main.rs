use anyhow::Context;
use clap::{Parser, Subcommand};
use phlpost_scraper::address::AddressDecomposer;
use phlpost_scraper::apis::PhlpostClient;
use phlpost_scraper::config::{Config, DEFAULT_CONFIG_PATH};
use phlpost_scraper::types::RegionCatalog;
use phlpost_scraper::{logging, output, FailurePolicy, Pipeline};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "phlpost_scraper")]
#[command(about = "PHLPost post office directory scraper")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, cache and parse every region, then write the records as JSON
    Run {
        /// Specific regions to process (comma-separated). Defaults to the full catalog.
        #[arg(long)]
        regions: Option<String>,
        /// Record per-region failures and keep going instead of aborting
        #[arg(long)]
        isolate_failures: bool,
        /// Override the configured output directory
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// List the regions currently offered by the remote catalog
    Regions,
    /// Decompose a single address and print the result as JSON
    Decompose {
        #[arg(long)]
        address: String,
        #[arg(long)]
        municipality: String,
        #[arg(long)]
        province: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    match cli.command {
        Commands::Run {
            regions,
            isolate_failures,
            output_dir,
        } => {
            println!("🔄 Running post office pipeline...");
            let mut pipeline = Pipeline::from_config(&config)?;
            if isolate_failures {
                pipeline = pipeline.with_failure_policy(FailurePolicy::Isolate);
            }

            let result = match regions {
                Some(list) => {
                    let selected: Vec<String> = list
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                    pipeline.run_regions(&selected).await
                }
                None => pipeline.run().await,
            };

            let run = match result {
                Ok(run) => run,
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed: {}", e);
                    return Err(e.into());
                }
            };

            let output_dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
            let output_file = output::persist_to_json(&run.records, &output_dir)?;
            info!("Saved {} records to {}", run.records.len(), output_file.display());

            println!("\n📊 Pipeline Results:");
            println!("   Regions processed: {}", run.regions_processed);
            println!("   Fetched: {}", run.fetched);
            println!("   From cache: {}", run.cache_hits);
            println!("   Records: {}", run.records.len());
            println!("   Output file: {}", output_file.display());

            if !run.failures.is_empty() {
                println!("\n⚠️  Regions that failed:");
                for failure in &run.failures {
                    println!("   - {}: {}", failure.region, failure.error);
                }
            }
        }
        Commands::Regions => {
            let client = PhlpostClient::new(config.source.clone())?;
            for region in client.list_regions().await? {
                println!("{region}");
            }
        }
        Commands::Decompose {
            address,
            municipality,
            province,
        } => {
            let decomposer = AddressDecomposer::new(config.locale_registry());
            let trace = decomposer.decompose_traced(&address, &municipality, &province);
            println!("{}", serde_json::to_string_pretty(&trace)?);
        }
    }
    Ok(())
}

use clap::Parser;
use std::path::PathBuf;
use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rbnz_series_scraper::config::Config;
use rbnz_series_scraper::db::{pool, SeriesRepository};
use rbnz_series_scraper::services::ScrapeService;

#[derive(Parser)]
#[command(name = "rbnz-series-scraper")]
#[command(about = "Scrape RBNZ statistical series into a SQLite database", long_about = None)]
struct Cli {
    /// Destination SQLite database path
    database: PathBuf,
}

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing with environment filter support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,rbnz_series_scraper=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env();
    info!("Starting scrape with config: {:?}", config);

    let service = ScrapeService::new(&config);
    let dataset = service.run().await?;
    info!(
        "Consolidated dataset: {} definitions, {} observations",
        dataset.definitions.len(),
        dataset.observations.len()
    );

    let pool = pool::connect(&cli.database).await?;
    let repository = SeriesRepository::new(pool);
    repository.replace_dataset(&dataset).await?;
    info!("Persisted dataset to {:?}", cli.database);

    Ok(())
}

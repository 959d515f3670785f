//! Seeds doctor records into Firestore.
//!
//! Run with:
//! ```
//! cargo run -p seed-data --bin seed
//! SEED_DATASET=doctors cargo run -p seed-data --bin seed
//! ```

use seed_data::config::SeedConfig;
use seed_data::seeder::seed_from_config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries only the confirmation line.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = SeedConfig::from_env();
    let report = seed_from_config(&config, &mut std::io::stdout().lock()).await?;

    tracing::info!("Seed completed!");
    tracing::info!("  Collection: {}", report.collection);
    tracing::info!("  Documents: {}", report.inserted.len());

    Ok(())
}

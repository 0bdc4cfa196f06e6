//! Demo entry point.

use metrics_exporter_prometheus::PrometheusBuilder;
use saga_demo::{DemoConfig, run_transfer};
use saga_log::{InMemoryLogStore, PostgresConfig, PostgresLogStore};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = DemoConfig::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    // 3. Pick the log store and run the transfer
    let database = PostgresConfig::from_env();
    let report = if database.database_url.is_some() {
        let store = PostgresLogStore::connect(&database).await?;
        run_transfer(&config, store).await?
    } else {
        tracing::info!("DATABASE_URL not set, using in-memory log store");
        run_transfer(&config, InMemoryLogStore::new()).await?
    };

    // 4. Report
    println!("{report}");
    println!("{}", metrics_handle.render());

    if !report.outcome.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

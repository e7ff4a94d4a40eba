use order_enrichment::api_client::ResilientApiClient;
use order_enrichment::config::Config;
use order_enrichment::db::Database;
use order_enrichment::enricher::RowEnricher;
use order_enrichment::filters::{aggregate_by_customer, filter_by_city, filter_by_start_date};
use order_enrichment::logging;
use order_enrichment::orders::OrderRepository;
use order_enrichment::report::{report_path, write_csv};

/// Main entry point for the application.
///
/// Loads orders from the database, keeps those for the configured city since
/// the start date, enriches each customer with a social handle, submits the
/// enriched record and writes a CSV report.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    logging::init(&Config::log_file_from_env())?;

    let config = Config::from_env()?;
    tracing::info!(
        "Starting enrichment of order data for customers living in {} since date: {}",
        config.city,
        config.start_date
    );

    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    let orders = OrderRepository::new(db.pool.clone())
        .fetch_customer_orders()
        .await?;
    let orders = filter_by_city(orders, &config.city);
    let orders = filter_by_start_date(orders, &config.start_date)?;
    let customers = aggregate_by_customer(&orders);
    tracing::info!("{} customers to enrich", customers.len());

    let client = ResilientApiClient::new(config.api_client_config())?;
    tracing::info!("✓ API client initialized: {}", config.api_base_url);

    let results = RowEnricher::new(client).enrich_all(&customers).await;

    tracing::info!("Writing output to CSV");
    let path = report_path(&config.output_dir, &config.start_date);
    write_csv(&path, &results)?;

    tracing::info!("Process complete.");
    Ok(())
}

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::DEFAULT_MAX_RETRIES;

/// Settings consumed by [`ResilientApiClient`](crate::api_client::ResilientApiClient).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub max_retries: u32,
    pub request_timeout: Duration,
    /// Use a delta-seconds `Retry-After` header as the wait when present.
    pub honor_retry_after: bool,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            request_timeout: Duration::from_secs(30),
            honor_retry_after: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub api_key: String,
    pub max_retries: u32,
    pub request_timeout_secs: u64,
    pub honor_retry_after: bool,
    pub database_url: String,
    pub city: String,
    pub start_date: String,
    pub output_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            api_base_url: std::env::var("ENRICHMENT_API_BASE_URL")
                .map_err(|_| {
                    anyhow::anyhow!("ENRICHMENT_API_BASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("ENRICHMENT_API_BASE_URL cannot be empty");
                    }
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        anyhow::bail!(
                            "ENRICHMENT_API_BASE_URL must start with http:// or https://"
                        );
                    }
                    url::Url::parse(&url).map_err(|e| {
                        anyhow::anyhow!("ENRICHMENT_API_BASE_URL is not a valid URL: {}", e)
                    })?;
                    Ok(url)
                })?,
            api_key: std::env::var("ENRICHMENT_API_KEY")
                .map_err(|_| anyhow::anyhow!("ENRICHMENT_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("ENRICHMENT_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            max_retries: std::env::var("MAX_RETRIES")
                .unwrap_or_else(|_| DEFAULT_MAX_RETRIES.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("MAX_RETRIES must be a non-negative integer"))?,
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be a number of seconds"))
                .and_then(|secs: u64| {
                    if secs == 0 {
                        anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(secs)
                })?,
            honor_retry_after: std::env::var("HONOR_RETRY_AFTER")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://database/client_data.db".to_string()),
            city: std::env::var("FILTER_CITY").unwrap_or_else(|_| "manchester".to_string()),
            start_date: std::env::var("FILTER_START_DATE")
                .unwrap_or_else(|_| "2024-09-01".to_string()),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            log_file: Self::log_file_from_env(),
        };

        // Never log the API key
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Enrichment API base URL: {}", config.api_base_url);
        tracing::debug!("Database URL: {}", config.database_url);
        tracing::debug!(
            "Max retries: {}, request timeout: {}s, honor Retry-After: {}",
            config.max_retries,
            config.request_timeout_secs,
            config.honor_retry_after
        );

        Ok(config)
    }

    /// Log file path, readable before the rest of the configuration so
    /// logging can start first.
    pub fn log_file_from_env() -> PathBuf {
        std::env::var("LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("customer_order_enrich.log"))
    }

    pub fn api_client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            base_url: self.api_base_url.clone(),
            api_key: self.api_key.clone(),
            max_retries: self.max_retries,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            honor_retry_after: self.honor_retry_after,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

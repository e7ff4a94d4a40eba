//! Shared helpers for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use order_enrichment::api_client::ResilientApiClient;
use order_enrichment::config::ApiClientConfig;
use order_enrichment::retry::Sleeper;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_API_KEY: &str = "test_secret";

/// Records requested waits instead of sleeping.
#[derive(Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Client pointed at `base_url` with a recording sleeper.
pub fn test_client(
    base_url: &str,
    max_retries: u32,
) -> (ResilientApiClient, Arc<RecordingSleeper>) {
    test_client_with(base_url, max_retries, false)
}

pub fn test_client_with(
    base_url: &str,
    max_retries: u32,
    honor_retry_after: bool,
) -> (ResilientApiClient, Arc<RecordingSleeper>) {
    let mut config = ApiClientConfig::new(base_url, TEST_API_KEY);
    config.max_retries = max_retries;
    config.request_timeout = Duration::from_secs(5);
    config.honor_retry_after = honor_retry_after;

    let sleeper = Arc::new(RecordingSleeper::default());
    let client = ResilientApiClient::new(config)
        .unwrap()
        .with_sleeper(sleeper.clone());
    (client, sleeper)
}

//! Retry policy shared by the enrichment lookup and the submission push.
//!
//! A call gets a fixed budget of attempts. Rate limits (429), server errors
//! (5xx) and transport failures consume the budget and wait
//! `2^n + jitter` seconds before the next attempt, with `n` counting the
//! retries already made and jitter drawn uniformly from `[0, 1)`.

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Attempts per call unless configured otherwise.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Why an attempt is going to be retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// HTTP 429.
    RateLimited,
    /// HTTP 5xx.
    ServerError(u16),
    /// Connection, timeout, DNS or body read failure.
    Network(String),
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryReason::RateLimited => write!(f, "Rate limited"),
            RetryReason::ServerError(status) => write!(f, "Server error ({})", status),
            RetryReason::Network(msg) => write!(f, "Network error: {}", msg),
        }
    }
}

/// Attempt bookkeeping for one client call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    pub attempt_count: u32,
    pub max_retries: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt_count: 0,
            max_retries,
        }
    }

    /// Whether another request may be sent.
    pub fn has_budget(&self) -> bool {
        self.attempt_count < self.max_retries
    }

    /// Records a retryable failure. Returns `true` once the budget is spent.
    pub fn record_failure(&mut self) -> bool {
        self.attempt_count += 1;
        self.attempt_count >= self.max_retries
    }

    /// Exponent for the wait that follows the latest failure.
    pub fn backoff_exponent(&self) -> u32 {
        self.attempt_count.saturating_sub(1)
    }
}

/// `2^attempt + jitter` seconds. Uncapped apart from saturating at `Duration::MAX`.
pub fn backoff_delay_with_jitter(attempt: u32, jitter: f64) -> Duration {
    let base = 2f64.powi(attempt.min(i32::MAX as u32) as i32);
    Duration::try_from_secs_f64(base + jitter).unwrap_or(Duration::MAX)
}

/// Exponential backoff with jitter drawn uniformly from `[0, 1)`.
pub fn backoff_delay(attempt: u32) -> Duration {
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    backoff_delay_with_jitter(attempt, jitter)
}

/// Reads a delta-seconds `Retry-After` header. HTTP-date values yield `None`.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Suspends the caller between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by the Tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

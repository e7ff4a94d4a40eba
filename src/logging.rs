//! Process-wide log sinks.
//!
//! Library code only emits `tracing` events; the binary calls [`init`] once
//! at startup to route them to the console and a log file.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "order_enrichment=info,info";

/// Build the filter from `RUST_LOG`, falling back to info.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install console and file sinks. The log file is truncated on each run.
pub fn init(log_file: &Path) -> anyhow::Result<()> {
    let file = File::create(log_file).map_err(|e| {
        anyhow::anyhow!("Failed to open log file {}: {}", log_file.display(), e)
    })?;

    let console_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

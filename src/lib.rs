//! Customer Order Enrichment Library
//!
//! This library enriches customer order aggregates with social-media handles
//! from an external enrichment API and forwards each enriched record to a
//! submission API, retrying rate limits, server errors and network failures
//! with exponential backoff.
//!
//! # Modules
//!
//! - `api_client`: Resilient client for the enrichment and submission endpoints.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `enricher`: Sequential row enrichment workflow.
//! - `errors`: Error handling types.
//! - `filters`: Date/city filters and per-customer aggregation.
//! - `logging`: Console and file log sinks.
//! - `models`: Core data models.
//! - `orders`: Order queries.
//! - `report`: CSV report output.
//! - `retry`: Backoff formula and retry bookkeeping.

pub mod api_client;
pub mod config;
pub mod db;
pub mod enricher;
pub mod errors;
pub mod filters;
pub mod logging;
pub mod models;
pub mod orders;
pub mod report;
pub mod retry;

//! Order filtering and per-customer aggregation.
//!
//! Orders arrive with dates in either `DD/MM/YYYY` or `YYYY-MM-DD` and
//! cities with inconsistent case and padding; both are normalised here
//! before the rows reach the enricher.

use crate::errors::AppError;
use crate::models::{CustomerAggregate, CustomerOrder};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;

const ORDER_DATE_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

const START_DATE_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}$";

/// Parse an order date in any of the accepted formats.
pub fn parse_order_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    ORDER_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

/// Keep orders whose customer lives in `city`, ignoring case and padding.
pub fn filter_by_city(orders: Vec<CustomerOrder>, city: &str) -> Vec<CustomerOrder> {
    let wanted = normalize_city(city);
    orders
        .into_iter()
        .filter(|order| {
            order
                .city
                .as_deref()
                .map(|c| normalize_city(c) == wanted)
                .unwrap_or(false)
        })
        .collect()
}

/// Keep orders placed on or after `start_date`.
///
/// Orders whose date cannot be parsed are dropped.
pub fn filter_by_start_date(
    orders: Vec<CustomerOrder>,
    start_date: &str,
) -> Result<Vec<CustomerOrder>, AppError> {
    let matches_format = Regex::new(START_DATE_PATTERN)
        .map(|re| re.is_match(start_date))
        .unwrap_or(false);
    if !matches_format {
        tracing::warn!(
            start_date,
            "Start date does not match the required format of YYYY-MM-DD"
        );
    }

    let start = NaiveDate::parse_from_str(start_date.trim(), "%Y-%m-%d")
        .ok()
        .or_else(|| parse_order_date(start_date))
        .ok_or_else(|| {
            AppError::InvalidInput(format!("Unparseable start date '{}'", start_date))
        })?;

    let before = orders.len();
    let kept: Vec<CustomerOrder> = orders
        .into_iter()
        .filter(|order| match parse_order_date(&order.order_date) {
            Some(date) => date >= start,
            None => {
                tracing::debug!(
                    order_id = order.order_id,
                    "Dropping order with unparseable date '{}'",
                    order.order_date
                );
                false
            }
        })
        .collect();

    tracing::debug!("Start date filter kept {} of {} orders", kept.len(), before);
    Ok(kept)
}

/// Roll orders up per customer, ordered by `customer_id`.
///
/// Name and email come from the first order seen for the customer.
pub fn aggregate_by_customer(orders: &[CustomerOrder]) -> Vec<CustomerAggregate> {
    let mut by_customer: BTreeMap<i64, CustomerAggregate> = BTreeMap::new();

    for order in orders {
        by_customer
            .entry(order.customer_id)
            .and_modify(|agg| agg.total_spend += order.order_total)
            .or_insert_with(|| CustomerAggregate {
                customer_id: order.customer_id,
                name: order.name.clone(),
                email: order.email.clone(),
                total_spend: order.order_total,
            });
    }

    by_customer.into_values().collect()
}

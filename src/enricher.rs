//! Row-by-row enrichment workflow
//!
//! For each customer aggregate, in order:
//! 1. Look up the social handle by email
//! 2. Build the submission record, filling gaps with empty values
//! 3. Submit the record
//! 4. Collect the outcome for the report
//!
//! A row's submission only starts after its lookup has finished, and each
//! call carries its own retry budget.
use crate::api_client::ResilientApiClient;
use crate::models::{ApiOutcome, CustomerAggregate, EnrichedCustomer, SubmissionRecord};

pub struct RowEnricher {
    client: ResilientApiClient,
}

impl RowEnricher {
    pub fn new(client: ResilientApiClient) -> Self {
        Self { client }
    }

    /// Enrich and submit every row, returning one result per input row.
    pub async fn enrich_all(&self, customers: &[CustomerAggregate]) -> Vec<EnrichedCustomer> {
        let mut results = Vec::with_capacity(customers.len());

        for (idx, customer) in customers.iter().enumerate() {
            results.push(self.enrich_one(idx, customer).await);
        }

        let enriched = results.iter().filter(|r| r.success).count();
        tracing::info!(
            "Enrichment finished: {}/{} customers enriched",
            enriched,
            results.len()
        );

        results
    }

    pub async fn enrich_one(&self, idx: usize, customer: &CustomerAggregate) -> EnrichedCustomer {
        tracing::info!(
            row = idx,
            customer_id = customer.customer_id,
            "Fetching social handle for row {} | email: {}",
            idx,
            customer.email.as_deref().unwrap_or("")
        );

        let fetched = self
            .client
            .fetch_social_handle(customer.email.as_deref())
            .await;
        let social_handle = extract_social_handle(&fetched);
        tracing::info!(customer_id = customer.customer_id, "Fetch status: {}", fetched.status);

        let record = submission_record(customer, social_handle.as_deref());
        tracing::info!(
            customer_id = customer.customer_id,
            "Sending data to submissions endpoint"
        );
        let submitted = self.client.submit(&record).await;
        let submission_status = submission_status(&submitted);
        tracing::info!(
            customer_id = customer.customer_id,
            "Post Status: {}",
            submission_status
        );

        EnrichedCustomer {
            customer_id: customer.customer_id,
            name: customer.name.clone(),
            email: customer.email.clone(),
            total_spend: customer.total_spend,
            social_handle,
            success: fetched.data.is_some(),
            reason: fetched.status,
            submission_status,
        }
    }
}

/// `social_handle` from a lookup payload, when it is a string.
pub fn extract_social_handle(outcome: &ApiOutcome) -> Option<String> {
    outcome
        .data
        .as_ref()
        .and_then(|data| data.get("social_handle"))
        .and_then(|handle| handle.as_str())
        .map(str::to_string)
}

/// Normalise a customer into the submission body.
pub fn submission_record(
    customer: &CustomerAggregate,
    social_handle: Option<&str>,
) -> SubmissionRecord {
    SubmissionRecord {
        customer_id: customer.customer_id,
        name: customer.name.clone().unwrap_or_default(),
        email: customer.email.clone().unwrap_or_default(),
        total_spend: if customer.total_spend.is_finite() {
            customer.total_spend
        } else {
            0.0
        },
        social_handle: social_handle.unwrap_or_default().to_string(),
    }
}

/// Status line for the report; validation failures include the server payload.
fn submission_status(outcome: &ApiOutcome) -> String {
    match (&outcome.data, outcome.is_success()) {
        (Some(payload), false) => format!("{}: {}", outcome.status, payload),
        _ => outcome.status.clone(),
    }
}

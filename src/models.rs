use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which branch of the response taxonomy produced an [`ApiOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    /// 2xx with a usable JSON body.
    Success,
    /// No email to look up; no request was made.
    NoInput,
    /// Retry budget consumed on rate limits, server or transport errors.
    Exhausted,
    /// Specific client error: 404 on fetch, 422 on submit.
    ClientError,
    /// Any other non-2xx status.
    OtherHttpError,
    /// 2xx without content.
    EmptyResult,
    /// 2xx whose body is not JSON.
    MalformedBody,
}

/// Result of a single client call.
///
/// `data` is `None` for every outcome except `Success` and a 422
/// validation error, which carries the server's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiOutcome {
    pub kind: OutcomeKind,
    pub data: Option<Value>,
    pub status: String,
}

impl ApiOutcome {
    pub fn new(kind: OutcomeKind, data: Option<Value>, status: impl Into<String>) -> Self {
        Self {
            kind,
            data,
            status: status.into(),
        }
    }

    /// Terminal outcome without a payload.
    pub fn without_data(kind: OutcomeKind, status: impl Into<String>) -> Self {
        Self::new(kind, None, status)
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

/// Outcome of a social-handle lookup.
pub type EnrichmentResult = ApiOutcome;

/// Outcome of pushing an enriched record.
pub type SubmissionResult = ApiOutcome;

/// Body of the submission POST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub customer_id: i64,
    pub name: String,
    pub email: String,
    pub total_spend: f64,
    pub social_handle: String,
}

/// One row of the orders/customers join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CustomerOrder {
    pub order_id: i64,
    pub customer_id: i64,
    /// Raw text; the source mixes `DD/MM/YYYY` and `YYYY-MM-DD`.
    pub order_date: String,
    pub order_total: f64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
}

/// Orders rolled up per customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAggregate {
    pub customer_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub total_spend: f64,
}

/// Output row written to the CSV report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCustomer {
    pub customer_id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub total_spend: f64,
    pub social_handle: Option<String>,
    /// True when the enrichment lookup returned data.
    pub success: bool,
    /// Status of the enrichment lookup.
    pub reason: String,
    pub submission_status: String,
}

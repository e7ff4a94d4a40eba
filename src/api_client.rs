use crate::config::ApiClientConfig;
use crate::errors::AppError;
use crate::models::{
    ApiOutcome, EnrichmentResult, OutcomeKind, SubmissionRecord, SubmissionResult,
};
use crate::retry::{
    backoff_delay, parse_retry_after, RetryReason, RetryState, Sleeper, TokioSleeper,
};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Header carrying the shared secret on both endpoints.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// How a single response (or transport failure) should be handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Retry(RetryReason),
    Terminal(Terminal),
}

/// Responses that end a call, before endpoint-specific interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    /// Non-2xx status that is not worth retrying.
    HttpError(StatusCode),
    /// 204, blank body, or an empty JSON value.
    Empty,
    Json(Value),
    /// 2xx body that failed to parse.
    Malformed(String),
}

/// Classifies a received response.
///
/// 429 and 5xx are retryable; every other status is terminal. A 2xx body is
/// "empty" when it is blank or parses to `null`, `""`, `{}` or `[]`.
pub fn classify_response(status: StatusCode, body: &str) -> Classification {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Classification::Retry(RetryReason::RateLimited);
    }
    if status.is_server_error() {
        return Classification::Retry(RetryReason::ServerError(status.as_u16()));
    }
    if !status.is_success() {
        return Classification::Terminal(Terminal::HttpError(status));
    }
    if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
        return Classification::Terminal(Terminal::Empty);
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) if is_empty_json(&value) => Classification::Terminal(Terminal::Empty),
        Ok(value) => Classification::Terminal(Terminal::Json(value)),
        Err(e) => Classification::Terminal(Terminal::Malformed(e.to_string())),
    }
}

fn is_empty_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Server-provided error text, falling back to the reason phrase.
fn error_text(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

/// Which call is running; drives log correlation and status wording.
#[derive(Debug, Clone, Copy)]
enum Call<'a> {
    Fetch { email: &'a str },
    Submit { customer_id: i64 },
}

impl Call<'_> {
    fn log_failure(&self, reason: &RetryReason, state: &RetryState, wait: Option<Duration>) {
        let attempt = state.attempt_count;
        let max_retries = state.max_retries;
        match (*self, wait) {
            (Call::Fetch { email }, Some(wait)) => tracing::warn!(
                email,
                attempt,
                max_retries,
                wait_secs = wait.as_secs_f64(),
                "{} for {}. Retrying in {:.1} seconds...",
                reason,
                email,
                wait.as_secs_f64()
            ),
            (Call::Fetch { email }, None) => tracing::warn!(
                email,
                attempt,
                max_retries,
                "{} for {} on final attempt",
                reason,
                email
            ),
            (Call::Submit { customer_id }, Some(wait)) => tracing::warn!(
                customer_id,
                attempt,
                max_retries,
                wait_secs = wait.as_secs_f64(),
                "{} while sending CustomerID: {}. Retrying in {:.1} seconds...",
                reason,
                customer_id,
                wait.as_secs_f64()
            ),
            (Call::Submit { customer_id }, None) => tracing::warn!(
                customer_id,
                attempt,
                max_retries,
                "{} while sending CustomerID: {} on final attempt",
                reason,
                customer_id
            ),
        }
    }

    fn exhausted(&self, max_retries: u32) -> ApiOutcome {
        let status = match *self {
            Call::Fetch { email } => {
                tracing::error!(
                    email,
                    max_retries,
                    "Error fetching social handle for customer. Max retries ({}) exceeded",
                    max_retries
                );
                format!("Max retries ({}) exceeded", max_retries)
            }
            Call::Submit { customer_id } => {
                let status = format!(
                    "Max retries ({}) exceeded while sending CustomerID: {}",
                    max_retries, customer_id
                );
                tracing::error!(customer_id, max_retries, "{}", status);
                status
            }
        };
        ApiOutcome::without_data(OutcomeKind::Exhausted, status)
    }

    fn resolve(&self, terminal: Terminal, body: &str) -> ApiOutcome {
        match (*self, terminal) {
            (Call::Fetch { .. }, Terminal::HttpError(StatusCode::NOT_FOUND)) => {
                ApiOutcome::without_data(OutcomeKind::ClientError, "Profile not found (404)")
            }
            (
                Call::Submit { customer_id },
                Terminal::HttpError(StatusCode::UNPROCESSABLE_ENTITY),
            ) => {
                let payload = serde_json::from_str::<Value>(body)
                    .unwrap_or_else(|_| Value::String(body.to_string()));
                tracing::error!(customer_id, "Data validation error: {}", payload);
                ApiOutcome::new(
                    OutcomeKind::ClientError,
                    Some(payload),
                    "Validation error (422)",
                )
            }
            (call, Terminal::HttpError(status)) => {
                let status_line = format!(
                    "HTTP error {}: {}",
                    status.as_u16(),
                    error_text(status, body)
                );
                match call {
                    Call::Fetch { email } => tracing::error!(email, "{}", status_line),
                    Call::Submit { customer_id } => tracing::error!(customer_id, "{}", status_line),
                }
                ApiOutcome::without_data(OutcomeKind::OtherHttpError, status_line)
            }
            (Call::Fetch { email }, Terminal::Empty) => {
                tracing::info!(email, "No data returned for {}", email);
                ApiOutcome::without_data(
                    OutcomeKind::EmptyResult,
                    format!("No data returned for {}", email),
                )
            }
            (Call::Submit { customer_id }, Terminal::Empty) => ApiOutcome::without_data(
                OutcomeKind::EmptyResult,
                format!("No content returned for CustomerID: {}", customer_id),
            ),
            (Call::Fetch { .. }, Terminal::Json(value)) => ApiOutcome::new(
                OutcomeKind::Success,
                Some(value),
                "Successfully found social handle for user",
            ),
            (Call::Submit { customer_id }, Terminal::Json(value)) => ApiOutcome::new(
                OutcomeKind::Success,
                Some(value),
                format!("Successfully submitted customer {}", customer_id),
            ),
            (call, Terminal::Malformed(detail)) => {
                match call {
                    Call::Fetch { email } => {
                        tracing::error!(email, "Invalid JSON in response: {}", detail)
                    }
                    Call::Submit { customer_id } => {
                        tracing::error!(customer_id, "Invalid JSON in response: {}", detail)
                    }
                }
                ApiOutcome::without_data(
                    OutcomeKind::MalformedBody,
                    format!("Invalid JSON in response: {}", detail),
                )
            }
        }
    }
}

/// Client for the enrichment and submission endpoints.
///
/// Both calls share one retry loop: rate limits, server errors and transport
/// failures are retried with exponential backoff until the budget runs out;
/// everything else ends the call. No call returns an error; every branch
/// resolves to an [`ApiOutcome`].
#[derive(Clone)]
pub struct ResilientApiClient {
    client: reqwest::Client,
    enrichment_url: Url,
    submission_url: Url,
    api_key: String,
    max_retries: u32,
    honor_retry_after: bool,
    sleeper: Arc<dyn Sleeper>,
}

impl ResilientApiClient {
    /// Creates a new `ResilientApiClient`.
    ///
    /// # Arguments
    ///
    /// * `config` - Base URL, shared secret, retry budget and timeout.
    pub fn new(config: ApiClientConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create API client: {}", e))
            })?;

        let base = config.base_url.trim_end_matches('/');
        let enrichment_url = endpoint_url(base, "enrichment")?;
        let submission_url = endpoint_url(base, "submission")?;

        Ok(Self {
            client,
            enrichment_url,
            submission_url,
            api_key: config.api_key,
            max_retries: config.max_retries,
            honor_retry_after: config.honor_retry_after,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replaces the sleep used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Looks up the social handle for an email.
    ///
    /// A missing or blank email returns immediately without a request.
    pub async fn fetch_social_handle(&self, email: Option<&str>) -> EnrichmentResult {
        let email = match email.map(str::trim) {
            Some(email) if !email.is_empty() => email,
            _ => return ApiOutcome::without_data(OutcomeKind::NoInput, "No email provided"),
        };

        self.execute(Call::Fetch { email }, || {
            self.client
                .get(self.enrichment_url.clone())
                .header(API_KEY_HEADER, &self.api_key)
                .query(&[("email", email)])
        })
        .await
    }

    /// Pushes an enriched record to the submission endpoint.
    ///
    /// A 422 response carries the server's validation payload as `data`.
    pub async fn submit(&self, record: &SubmissionRecord) -> SubmissionResult {
        let call = Call::Submit {
            customer_id: record.customer_id,
        };

        self.execute(call, || {
            self.client
                .post(self.submission_url.clone())
                .header(API_KEY_HEADER, &self.api_key)
                .header(CONTENT_TYPE, "application/json")
                .json(record)
        })
        .await
    }

    async fn execute<F>(&self, call: Call<'_>, build_request: F) -> ApiOutcome
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut state = RetryState::new(self.max_retries);

        while state.has_budget() {
            let (reason, retry_after) = match send(build_request()).await {
                Ok(response) => match classify_response(response.status, &response.body) {
                    Classification::Retry(reason) => {
                        (reason, parse_retry_after(&response.headers))
                    }
                    Classification::Terminal(terminal) => {
                        return call.resolve(terminal, &response.body)
                    }
                },
                Err(e) => (RetryReason::Network(e.to_string()), None),
            };

            if state.record_failure() {
                call.log_failure(&reason, &state, None);
                break;
            }

            let wait = self.wait_time(&state, retry_after);
            call.log_failure(&reason, &state, Some(wait));
            self.sleeper.sleep(wait).await;
        }

        call.exhausted(state.max_retries)
    }

    fn wait_time(&self, state: &RetryState, retry_after: Option<Duration>) -> Duration {
        match retry_after {
            Some(wait) if self.honor_retry_after => wait,
            _ => backoff_delay(state.backoff_exponent()),
        }
    }
}

async fn send(request: reqwest::RequestBuilder) -> Result<RawResponse, reqwest::Error> {
    let response = request.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;
    Ok(RawResponse {
        status,
        headers,
        body,
    })
}

fn endpoint_url(base: &str, path: &str) -> Result<Url, AppError> {
    Url::parse(&format!("{}/{}", base, path)).map_err(|e| {
        AppError::ExternalApiError(format!("Invalid API base URL '{}': {}", base, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_retryable_statuses() {
        assert_eq!(
            classify_response(StatusCode::TOO_MANY_REQUESTS, ""),
            Classification::Retry(RetryReason::RateLimited)
        );
        assert_eq!(
            classify_response(StatusCode::INTERNAL_SERVER_ERROR, "oops"),
            Classification::Retry(RetryReason::ServerError(500))
        );
        assert_eq!(
            classify_response(StatusCode::from_u16(599).unwrap(), ""),
            Classification::Retry(RetryReason::ServerError(599))
        );
    }

    #[test]
    fn test_classify_terminal_statuses() {
        assert_eq!(
            classify_response(StatusCode::NOT_FOUND, ""),
            Classification::Terminal(Terminal::HttpError(StatusCode::NOT_FOUND))
        );
        assert_eq!(
            classify_response(StatusCode::BAD_REQUEST, "bad"),
            Classification::Terminal(Terminal::HttpError(StatusCode::BAD_REQUEST))
        );
    }

    #[test]
    fn test_classify_empty_bodies() {
        for body in ["", "   ", "null", "{}", "[]", "\"\""] {
            assert_eq!(
                classify_response(StatusCode::OK, body),
                Classification::Terminal(Terminal::Empty),
                "body {:?}",
                body
            );
        }
        assert_eq!(
            classify_response(StatusCode::NO_CONTENT, "{\"a\":1}"),
            Classification::Terminal(Terminal::Empty)
        );
    }

    #[test]
    fn test_classify_json_and_malformed() {
        assert_eq!(
            classify_response(StatusCode::OK, r#"{"social_handle":"@x"}"#),
            Classification::Terminal(Terminal::Json(json!({"social_handle": "@x"})))
        );
        assert!(matches!(
            classify_response(StatusCode::OK, "<html>"),
            Classification::Terminal(Terminal::Malformed(_))
        ));
    }

    #[test]
    fn test_error_text_falls_back_to_reason() {
        assert_eq!(error_text(StatusCode::BAD_REQUEST, ""), "Bad Request");
        assert_eq!(error_text(StatusCode::BAD_REQUEST, " nope "), "nope");
    }

    #[test]
    fn test_resolve_fetch_not_found() {
        let outcome = Call::Fetch { email: "a@b.com" }
            .resolve(Terminal::HttpError(StatusCode::NOT_FOUND), "");
        assert_eq!(outcome.kind, OutcomeKind::ClientError);
        assert_eq!(outcome.status, "Profile not found (404)");
        assert!(outcome.data.is_none());
    }

    #[test]
    fn test_resolve_submit_not_found_is_generic() {
        let outcome = Call::Submit { customer_id: 3 }
            .resolve(Terminal::HttpError(StatusCode::NOT_FOUND), "no route");
        assert_eq!(outcome.kind, OutcomeKind::OtherHttpError);
        assert_eq!(outcome.status, "HTTP error 404: no route");
    }

    #[test]
    fn test_resolve_submit_422_non_json_body() {
        let outcome = Call::Submit { customer_id: 3 }
            .resolve(Terminal::HttpError(StatusCode::UNPROCESSABLE_ENTITY), "bad email");
        assert_eq!(outcome.kind, OutcomeKind::ClientError);
        assert_eq!(outcome.data, Some(json!("bad email")));
    }

    #[test]
    fn test_exhausted_status_wording() {
        let fetch = Call::Fetch { email: "a@b.com" }.exhausted(5);
        assert_eq!(fetch.kind, OutcomeKind::Exhausted);
        assert_eq!(fetch.status, "Max retries (5) exceeded");

        let submit = Call::Submit { customer_id: 42 }.exhausted(2);
        assert_eq!(
            submit.status,
            "Max retries (2) exceeded while sending CustomerID: 42"
        );
    }

    #[test]
    fn test_client_creation() {
        let client = ResilientApiClient::new(ApiClientConfig::new(
            "http://localhost:5000/",
            "key",
        ))
        .unwrap();
        assert_eq!(
            client.enrichment_url.as_str(),
            "http://localhost:5000/enrichment"
        );
        assert_eq!(
            client.submission_url.as_str(),
            "http://localhost:5000/submission"
        );
        assert_eq!(client.max_retries(), 5);
    }

    #[test]
    fn test_client_rejects_invalid_base_url() {
        let result = ResilientApiClient::new(ApiClientConfig::new("not a url", "key"));
        assert!(result.is_err());
    }
}

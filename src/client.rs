// HTTP client for the holiday source and the submission endpoint
// Both sit behind traits so the form can run against in-memory doubles

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::form::SubmissionPayload;
use crate::holiday::{Holiday, HolidayQuery};

/// Default endpoint bookings are posted to.
pub const DEFAULT_SUBMISSION_URL: &str = "http://letsworkout.pl/submit";

// Error types for remote calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    DecodeError(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub holiday_endpoint: String,
    pub api_key: String,
    pub submission_endpoint: String,
    /// Applies to the submission POST only; holiday fetches have no timeout.
    pub submission_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            holiday_endpoint: String::new(),
            api_key: String::new(),
            submission_endpoint: DEFAULT_SUBMISSION_URL.to_string(),
            submission_timeout_ms: 10_000,
        }
    }
}

// Client statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ClientStats {
    pub requests_sent: usize,
    pub requests_succeeded: usize,
    pub requests_failed: usize,
    pub requests_timeout: usize,
    pub average_response_time_ms: f64,
    pub max_response_time_ms: f64,
}

impl ClientStats {
    fn record(&mut self, elapsed: Duration, outcome: Result<(), &ApiError>) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        self.requests_sent += 1;
        match outcome {
            Ok(()) => self.requests_succeeded += 1,
            Err(ApiError::Timeout(_)) => {
                self.requests_failed += 1;
                self.requests_timeout += 1;
            }
            Err(_) => self.requests_failed += 1,
        }
        self.average_response_time_ms +=
            (elapsed_ms - self.average_response_time_ms) / self.requests_sent as f64;
        self.max_response_time_ms = self.max_response_time_ms.max(elapsed_ms);
    }
}

/// Acknowledgement of an accepted submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub status_code: u16,
}

// Source of holiday records, one category per request
#[async_trait]
pub trait HolidaySource: Send + Sync + 'static {
    async fn fetch(&self, query: &HolidayQuery) -> Result<Vec<Holiday>, ApiError>;
}

// Destination of completed booking forms
#[async_trait]
pub trait SubmissionSink: Send + Sync + 'static {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, ApiError>;
}

/// reqwest-backed client for both remote endpoints.
pub struct BookingApiClient {
    config: ClientConfig,
    http: reqwest::Client,
    stats: Mutex<ClientStats>,
}

impl BookingApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        if config.submission_endpoint.trim().is_empty() {
            return Err(ClientError::ConfigError(
                "submission endpoint must not be empty".to_string(),
            ));
        }
        if config.submission_timeout_ms == 0 {
            return Err(ClientError::ConfigError(
                "timeout must be greater than zero".to_string(),
            ));
        }

        // No client-wide timeout; the holiday fetch runs until the server answers.
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ClientError::InitError(err.to_string()))?;

        Ok(Self {
            config,
            http,
            stats: Mutex::new(ClientStats::default()),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn stats(&self) -> ClientStats {
        self.stats.lock().clone()
    }

    fn map_transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.config.submission_timeout_ms)
        } else if err.is_decode() {
            ApiError::DecodeError(err.to_string())
        } else {
            ApiError::NetworkError(err.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(ApiError::ApiResponseError {
            status_code: status.as_u16(),
            message,
        })
    }

    async fn fetch_holidays(&self, query: &HolidayQuery) -> Result<Vec<Holiday>, ApiError> {
        if self.config.holiday_endpoint.trim().is_empty() {
            return Err(ApiError::NetworkError(
                "holiday endpoint is not configured".to_string(),
            ));
        }

        let response = self
            .http
            .get(&self.config.holiday_endpoint)
            .query(&[
                ("country", query.country.as_str().to_string()),
                ("year", query.year.to_string()),
                ("type", query.category.as_query_value().to_string()),
            ])
            .header("X-Api-Key", &self.config.api_key)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        let response = Self::check_status(response).await?;
        response
            .json::<Vec<Holiday>>()
            .await
            .map_err(|err| self.map_transport_error(err))
    }

    async fn post_submission(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionReceipt, ApiError> {
        let form = payload
            .fields()
            .into_iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                form.text(name, value.to_string())
            });

        let response = self
            .http
            .post(&self.config.submission_endpoint)
            .timeout(Duration::from_millis(self.config.submission_timeout_ms))
            .multipart(form)
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        let response = Self::check_status(response).await?;
        Ok(SubmissionReceipt {
            status_code: response.status().as_u16(),
        })
    }
}

#[async_trait]
impl HolidaySource for BookingApiClient {
    async fn fetch(&self, query: &HolidayQuery) -> Result<Vec<Holiday>, ApiError> {
        let started = Instant::now();
        let result = self.fetch_holidays(query).await;
        self.stats
            .lock()
            .record(started.elapsed(), result.as_ref().map(|_| ()));

        match &result {
            Ok(holidays) => {
                debug!(category = %query.category, count = holidays.len(), "Holiday category fetched")
            }
            Err(err) => warn!(category = %query.category, error = %err, "Holiday category failed"),
        }
        result
    }
}

#[async_trait]
impl SubmissionSink for BookingApiClient {
    async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmissionReceipt, ApiError> {
        let started = Instant::now();
        let result = self.post_submission(payload).await;
        self.stats
            .lock()
            .record(started.elapsed(), result.as_ref().map(|_| ()));
        result
    }
}

// In-memory doubles for the remote endpoints
#[cfg(test)]
pub mod mock_server {
    use super::*;
    use crate::holiday::HolidayCategory;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct MockHolidaySource {
        responses: Mutex<HashMap<HolidayCategory, Vec<Holiday>>>,
        failing: Mutex<HashSet<HolidayCategory>>,
        queries: Mutex<Vec<HolidayQuery>>,
        request_count: AtomicUsize,
        delay_ms: AtomicUsize,
    }

    impl MockHolidaySource {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                failing: Mutex::new(HashSet::new()),
                queries: Mutex::new(Vec::new()),
                request_count: AtomicUsize::new(0),
                delay_ms: AtomicUsize::new(0),
            }
        }

        pub fn set_response(&self, category: HolidayCategory, holidays: Vec<Holiday>) {
            self.responses.lock().insert(category, holidays);
        }

        pub fn fail_category(&self, category: HolidayCategory) {
            self.failing.lock().insert(category);
        }

        pub fn set_delay_ms(&self, delay_ms: usize) {
            self.delay_ms.store(delay_ms, Ordering::SeqCst);
        }

        pub fn request_count(&self) -> usize {
            self.request_count.load(Ordering::SeqCst)
        }

        pub fn queries(&self) -> Vec<HolidayQuery> {
            self.queries.lock().clone()
        }
    }

    #[async_trait]
    impl HolidaySource for MockHolidaySource {
        async fn fetch(&self, query: &HolidayQuery) -> Result<Vec<Holiday>, ApiError> {
            self.request_count.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().push(query.clone());

            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay as u64)).await;
            }

            if self.failing.lock().contains(&query.category) {
                return Err(ApiError::ApiResponseError {
                    status_code: 503,
                    message: "Service temporarily unavailable".to_string(),
                });
            }

            Ok(self
                .responses
                .lock()
                .get(&query.category)
                .cloned()
                .unwrap_or_default())
        }
    }

    pub struct MockSubmissionSink {
        submissions: Mutex<Vec<SubmissionPayload>>,
        fail_next_submissions: AtomicUsize,
    }

    impl MockSubmissionSink {
        pub fn new() -> Self {
            Self {
                submissions: Mutex::new(Vec::new()),
                fail_next_submissions: AtomicUsize::new(0),
            }
        }

        pub fn fail_next_submissions(&self, count: usize) {
            self.fail_next_submissions.store(count, Ordering::SeqCst);
        }

        /// Attempts received, failed ones included.
        pub fn submission_count(&self) -> usize {
            self.submissions.lock().len()
        }

        pub fn submissions(&self) -> Vec<SubmissionPayload> {
            self.submissions.lock().clone()
        }
    }

    #[async_trait]
    impl SubmissionSink for MockSubmissionSink {
        async fn submit(
            &self,
            payload: &SubmissionPayload,
        ) -> Result<SubmissionReceipt, ApiError> {
            self.submissions.lock().push(payload.clone());

            let fail_count = self.fail_next_submissions.load(Ordering::SeqCst);
            if fail_count > 0 {
                self.fail_next_submissions
                    .store(fail_count - 1, Ordering::SeqCst);
                return Err(ApiError::NetworkError("Connection reset".to_string()));
            }

            Ok(SubmissionReceipt { status_code: 200 })
        }
    }
}

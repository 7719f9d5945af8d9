use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::api::validation;
use crate::contracts::{
    CombinedRankEntry, Metric, MetricRecord, MetricsStore, RankEntry, StorageError, UserRank,
    ValidationError,
};
use crate::ranking::LEADERBOARD_SIZE;

/// Server metrics for monitoring.
#[derive(Default)]
pub struct Metrics {
    pub submissions_total: AtomicU64,
    pub records_created_total: AtomicU64,
    pub rank_reads_total: AtomicU64,
    pub validation_errors_total: AtomicU64,
    pub store_errors_total: AtomicU64,
    pub submit_latency_sum_us: AtomicU64,
    pub read_latency_sum_us: AtomicU64,
    pub start_time: std::sync::OnceLock<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        let m = Self::default();
        let _ = m.start_time.set(Instant::now());
        m
    }

    pub fn record_submission(&self, created: bool, latency_us: u64) {
        self.submissions_total.fetch_add(1, Ordering::Relaxed);
        if created {
            self.records_created_total.fetch_add(1, Ordering::Relaxed);
        }
        self.submit_latency_sum_us
            .fetch_add(latency_us, Ordering::Relaxed);
    }

    pub fn record_read(&self, latency_us: u64) {
        self.rank_reads_total.fetch_add(1, Ordering::Relaxed);
        self.read_latency_sum_us
            .fetch_add(latency_us, Ordering::Relaxed);
    }

    pub fn record_validation_error(&self) {
        self.validation_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors_total.fetch_add(1, Ordering::Relaxed);
    }
}

/// Application state shared across handlers.
pub struct AppState<S: MetricsStore> {
    pub store: Arc<S>,
    pub metrics: Arc<Metrics>,
}

impl<S: MetricsStore> AppState<S> {
    pub fn new(store: Arc<S>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    /// Counts a failed store call and converts it for the response.
    fn store_failure(&self, e: StorageError) -> ApiError {
        self.metrics.record_store_error();
        tracing::error!(error = %e, "Metrics store call failed");
        ApiError::from(e)
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    Storage(StorageError),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_response) = match self {
            ApiError::Storage(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: e.to_string(),
                    code: "STORE_UNAVAILABLE".into(),
                },
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: msg,
                    code: "BAD_REQUEST".into(),
                },
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// POST /metrics
/// Validates a submission and adds it onto the record for its email,
/// creating the record on first submission.
pub async fn submit_metrics<S: MetricsStore>(
    State(state): State<Arc<AppState<S>>>,
    body: Bytes,
) -> Result<Json<MetricRecord>, ApiError> {
    let start = Instant::now();

    let submission = validation::parse_submission(&body).map_err(|e| {
        state.metrics.record_validation_error();
        tracing::debug!(error = %e, "Rejected metrics submission");
        ApiError::from(e)
    })?;

    let outcome = state
        .store
        .upsert(&submission)
        .map_err(|e| state.store_failure(e))?;

    let latency_us = start.elapsed().as_micros() as u64;
    state.metrics.record_submission(outcome.created, latency_us);

    tracing::info!(
        email = %outcome.record.email,
        user_github = %outcome.record.user_github,
        created = outcome.created,
        "Accepted metrics submission"
    );

    Ok(Json(outcome.record))
}

/// GET /rank-{metric}
/// Top users for one metric, highest first.
pub async fn rank_by_metric<S: MetricsStore>(
    state: Arc<AppState<S>>,
    metric: Metric,
) -> Result<Json<Vec<RankEntry>>, ApiError> {
    let start = Instant::now();

    let entries = state
        .store
        .top_by(metric, LEADERBOARD_SIZE)
        .map_err(|e| state.store_failure(e))?;

    state
        .metrics
        .record_read(start.elapsed().as_micros() as u64);

    Ok(Json(entries))
}

/// GET /user-rank-{metric}/{user_github}
/// Rank of each record the user owns for one metric.
pub async fn user_rank<S: MetricsStore>(
    state: Arc<AppState<S>>,
    metric: Metric,
    user_github: String,
) -> Result<Json<Vec<UserRank>>, ApiError> {
    let start = Instant::now();

    let ranks = state
        .store
        .user_rank(metric, &user_github)
        .map_err(|e| state.store_failure(e))?;

    if ranks.is_empty() {
        tracing::debug!(user_github = %user_github, metric = %metric, "No records for user");
    }

    state
        .metrics
        .record_read(start.elapsed().as_micros() as u64);

    Ok(Json(ranks))
}

/// GET /
/// Every stored record.
pub async fn list_metrics<S: MetricsStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<MetricRecord>>, ApiError> {
    let start = Instant::now();

    let records = state
        .store
        .list_records()
        .map_err(|e| state.store_failure(e))?;

    state
        .metrics
        .record_read(start.elapsed().as_micros() as u64);

    Ok(Json(records))
}

/// GET /metrics/ranking
/// All users ranked by clicks, then distance.
pub async fn combined_ranking<S: MetricsStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<CombinedRankEntry>>, ApiError> {
    let start = Instant::now();

    let entries = state
        .store
        .combined_ranking()
        .map_err(|e| state.store_failure(e))?;

    state
        .metrics
        .record_read(start.elapsed().as_micros() as u64);

    Ok(Json(entries))
}

/// GET /health
/// Health check endpoint.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy"
    }))
}

/// Response for stats endpoint.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_secs: f64,
    pub submissions: SubmissionStats,
    pub reads: ReadStats,
    pub errors: ErrorStats,
}

#[derive(Debug, Serialize)]
pub struct SubmissionStats {
    pub total: u64,
    pub records_created: u64,
    pub rate_per_sec: f64,
    pub avg_latency_us: f64,
}

#[derive(Debug, Serialize)]
pub struct ReadStats {
    pub total: u64,
    pub rate_per_sec: f64,
    pub avg_latency_us: f64,
}

#[derive(Debug, Serialize)]
pub struct ErrorStats {
    pub validation: u64,
    pub store: u64,
}

/// Calculates rate per second, returning 0.0 if duration is zero.
#[inline]
fn safe_rate(count: u64, duration_secs: f64) -> f64 {
    if duration_secs > 0.0 {
        count as f64 / duration_secs
    } else {
        0.0
    }
}

/// Calculates average, returning 0.0 if count is zero.
#[inline]
fn safe_avg(sum: u64, count: u64) -> f64 {
    if count > 0 {
        sum as f64 / count as f64
    } else {
        0.0
    }
}

/// GET /stats
/// Server statistics.
pub async fn get_stats<S: MetricsStore>(
    State(state): State<Arc<AppState<S>>>,
) -> impl IntoResponse {
    let metrics = &state.metrics;

    let uptime_secs = metrics
        .start_time
        .get()
        .map(|t| t.elapsed().as_secs_f64())
        .unwrap_or(0.0);

    let submissions_total = metrics.submissions_total.load(Ordering::Relaxed);
    let submit_latency_sum = metrics.submit_latency_sum_us.load(Ordering::Relaxed);
    let reads_total = metrics.rank_reads_total.load(Ordering::Relaxed);
    let read_latency_sum = metrics.read_latency_sum_us.load(Ordering::Relaxed);

    Json(StatsResponse {
        uptime_secs,
        submissions: SubmissionStats {
            total: submissions_total,
            records_created: metrics.records_created_total.load(Ordering::Relaxed),
            rate_per_sec: safe_rate(submissions_total, uptime_secs),
            avg_latency_us: safe_avg(submit_latency_sum, submissions_total),
        },
        reads: ReadStats {
            total: reads_total,
            rate_per_sec: safe_rate(reads_total, uptime_secs),
            avg_latency_us: safe_avg(read_latency_sum, reads_total),
        },
        errors: ErrorStats {
            validation: metrics.validation_errors_total.load(Ordering::Relaxed),
            store: metrics.store_errors_total.load(Ordering::Relaxed),
        },
    })
}

//! # Application State Management
//!
//! This module manages state shared by all HTTP request handlers.
//!
//! ## What is shared:
//! - **config**: the effective configuration, read-only after startup
//! - **pipeline**: the translate/speak orchestrator, immutable after startup
//!   (it owns the one cipher key this process will ever use)
//! - **metrics**: counters updated by middleware and handlers
//!
//! ## Key Rust Concepts:
//!
//! ### Arc (Atomically Reference Counted)
//! - **Purpose**: Allows every worker thread to share ownership of the same data
//! - **Why enough for config and pipeline**: they never change after startup,
//!   so no lock is needed to read them
//!
//! ### RwLock (Reader-Writer Lock)
//! - **Purpose**: Allows multiple readers OR one writer at a time
//! - **Used only for metrics**: the one piece of state that requests mutate

use crate::config::AppConfig;
use crate::pipeline::Pipeline;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

/// The main application state that's shared across all HTTP request handlers.
///
/// ## Rust Concepts:
/// - **#[derive(Clone)]**: Cloning only bumps the `Arc` reference counts
/// - **Arc<Pipeline>**: One pipeline (one cipher, one store) for the whole process
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (fixed at startup)
    pub config: Arc<AppConfig>,

    /// Translate/speak orchestrator
    pub pipeline: Arc<Pipeline>,

    /// Request and artifact counters (updated by every request)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,
}

/// Counters collected across all HTTP requests.
///
/// ## Why these metrics matter:
/// - **artifacts_created / artifacts_served**: pipeline throughput
/// - **artifacts_missing**: how often clients arrive after cleanup removed an artifact
/// - **decryption_failures**: should stay at zero; anything else means corruption
///   or a key change across restarts
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of error responses since server start
    pub error_count: u64,

    pub artifacts_created: u64,
    pub artifacts_served: u64,
    pub artifacts_missing: u64,
    pub decryption_failures: u64,

    /// Per-endpoint statistics, keyed by "METHOD /path"
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    /// Number of requests to this specific endpoint
    pub request_count: u64,

    /// Total time spent processing all requests to this endpoint (milliseconds)
    pub total_duration_ms: u64,

    /// Number of errors that occurred for this endpoint
    pub error_count: u64,
}

/// Artifact lifecycle events recorded by the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactEvent {
    Created,
    Served,
    Missing,
    DecryptionFailed,
}

impl AppState {
    /// Create a new AppState from the validated configuration and the assembled pipeline.
    pub fn new(config: AppConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config: Arc::new(config),
            pipeline,
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
        }
    }

    /// Read access to metrics. A poisoned lock still holds valid counters.
    fn metrics_read(&self) -> RwLockReadGuard<'_, AppMetrics> {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn metrics_write(&self) -> RwLockWriteGuard<'_, AppMetrics> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increment the total request counter (called by middleware for every request).
    pub fn increment_request_count(&self) {
        self.metrics_write().request_count += 1;
    }

    /// Increment the total error counter (called for every 4xx/5xx response).
    pub fn increment_error_count(&self) {
        self.metrics_write().error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    ///
    /// The first time we see an endpoint, we create a new EndpointMetric with default values.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics_write();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;
        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Count an artifact lifecycle event.
    pub fn record_artifact_event(&self, event: ArtifactEvent) {
        let mut metrics = self.metrics_write();
        match event {
            ArtifactEvent::Created => metrics.artifacts_created += 1,
            ArtifactEvent::Served => metrics.artifacts_served += 1,
            ArtifactEvent::Missing => metrics.artifacts_missing += 1,
            ArtifactEvent::DecryptionFailed => metrics.decryption_failures += 1,
        }
    }

    /// Get a snapshot of current metrics (cloned so no lock is held while serializing).
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics_read().clone()
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

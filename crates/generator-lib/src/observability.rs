//! Observability infrastructure for the generator service
//!
//! Provides:
//! - Prometheus metrics (requests, generation latency, validation warnings)
//! - Structured JSON logging with tracing

use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for generation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<GeneratorMetricsInner> = OnceLock::new();

struct GeneratorMetricsInner {
    requests_total: CounterVec,
    duration_seconds: HistogramVec,
    warnings_total: CounterVec,
}

impl GeneratorMetricsInner {
    fn new() -> Self {
        Self {
            requests_total: register_counter_vec!(
                "devops_generator_requests_total",
                "Generator calls by generator, operation and outcome",
                &["generator", "operation", "outcome"]
            )
            .expect("Failed to register requests_total"),

            duration_seconds: register_histogram_vec!(
                "devops_generator_duration_seconds",
                "Time spent generating or validating an artifact",
                &["generator", "operation"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register duration_seconds"),

            warnings_total: register_counter_vec!(
                "devops_generator_warnings_total",
                "Validation warnings reported, by generator",
                &["generator"]
            )
            .expect("Failed to register warnings_total"),
        }
    }
}

/// Generator metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct GeneratorMetrics {
    _private: (),
}

impl Default for GeneratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorMetrics {
    /// Create a metrics handle (registers the global metrics on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(GeneratorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &GeneratorMetricsInner {
        GLOBAL_METRICS.get_or_init(GeneratorMetricsInner::new)
    }

    /// Record one generate/validate call and its latency
    pub fn observe(&self, generator: &str, operation: &str, success: bool, duration_secs: f64) {
        let outcome = if success { "success" } else { "error" };
        let inner = self.inner();
        inner
            .requests_total
            .with_label_values(&[generator, operation, outcome])
            .inc();
        inner
            .duration_seconds
            .with_label_values(&[generator, operation])
            .observe(duration_secs);
    }

    /// Count the warnings a validation returned
    pub fn add_warnings(&self, generator: &str, count: usize) {
        self.inner()
            .warnings_total
            .with_label_values(&[generator])
            .inc_by(count as f64);
    }

    /// Current value of the request counter for one label set
    pub fn requests(&self, generator: &str, operation: &str, outcome: &str) -> f64 {
        self.inner()
            .requests_total
            .with_label_values(&[generator, operation, outcome])
            .get()
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, addr: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            addr = %addr,
            "Generator service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Generator service shutting down"
        );
    }

    /// Log a generated artifact
    pub fn log_generated(&self, generator: &str, files: usize, duration_ms: f64) {
        info!(
            event = "artifact_generated",
            service = %self.service,
            generator = %generator,
            files = files,
            duration_ms = duration_ms,
            "Artifact generated"
        );
    }

    /// Log a validation outcome
    pub fn log_validated(&self, generator: &str, valid: bool, warnings: usize) {
        if valid {
            info!(
                event = "artifact_validated",
                service = %self.service,
                generator = %generator,
                valid = true,
                warnings = warnings,
                "Artifact validated"
            );
        } else {
            warn!(
                event = "artifact_validated",
                service = %self.service,
                generator = %generator,
                valid = false,
                warnings = warnings,
                "Artifact validation found high severity warnings"
            );
        }
    }

    /// Log a request rejected before reaching a generator
    pub fn log_rejected(&self, path: &str, reason: &str, errors: usize) {
        warn!(
            event = "request_rejected",
            service = %self.service,
            path = %path,
            reason = %reason,
            errors = errors,
            "Request rejected"
        );
    }
}

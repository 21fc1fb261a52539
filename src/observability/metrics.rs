//! Metrics for the resolution pipeline
//!
//! Recording goes through the `metrics` facade, so calls are no-ops until a
//! recorder is installed with [`init`] (the web server does this; the CLI
//! does not).

use once_cell::sync::OnceCell;
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Resolver metrics
    ResolverResolved,
    ResolverPatternMissing,
    ResolverFetchFailed,
    ResolverCacheHits,
    ResolverFetchDuration,

    // Pipeline metrics
    PipelineRuns,
    PipelineRowsProcessed,
    PipelineIntervalInversions,
    PipelineDetectionFailures,
    PipelineDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ResolverResolved => "photo_intervals_resolver_resolved_total",
            MetricName::ResolverPatternMissing => "photo_intervals_resolver_pattern_missing_total",
            MetricName::ResolverFetchFailed => "photo_intervals_resolver_fetch_failed_total",
            MetricName::ResolverCacheHits => "photo_intervals_resolver_cache_hits_total",
            MetricName::ResolverFetchDuration => "photo_intervals_resolver_fetch_duration_seconds",

            MetricName::PipelineRuns => "photo_intervals_pipeline_runs_total",
            MetricName::PipelineRowsProcessed => "photo_intervals_pipeline_rows_processed_total",
            MetricName::PipelineIntervalInversions => "photo_intervals_pipeline_interval_inversions_total",
            MetricName::PipelineDetectionFailures => "photo_intervals_pipeline_detection_failures_total",
            MetricName::PipelineDuration => "photo_intervals_pipeline_duration_seconds",
        }
    }
}

static METRICS_HANDLE: OnceCell<metrics_exporter_prometheus::PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    let _ = METRICS_HANDLE.set(handle);
    info!("Metrics system initialized");
    Ok(())
}

/// Prometheus text exposition, if the recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|h| h.render())
}

pub mod resolver {
    use super::MetricName;

    pub fn resolved() {
        metrics::counter!(MetricName::ResolverResolved.as_str()).increment(1);
    }

    pub fn pattern_missing() {
        metrics::counter!(MetricName::ResolverPatternMissing.as_str()).increment(1);
    }

    pub fn fetch_failed(kind: &'static str) {
        metrics::counter!(MetricName::ResolverFetchFailed.as_str(), "kind" => kind).increment(1);
    }

    pub fn cache_hit() {
        metrics::counter!(MetricName::ResolverCacheHits.as_str()).increment(1);
    }

    pub fn fetch_duration(secs: f64) {
        metrics::histogram!(MetricName::ResolverFetchDuration.as_str()).record(secs);
    }
}

pub mod pipeline {
    use super::MetricName;

    pub fn run_started() {
        metrics::counter!(MetricName::PipelineRuns.as_str()).increment(1);
    }

    pub fn rows_processed(count: usize) {
        metrics::counter!(MetricName::PipelineRowsProcessed.as_str()).increment(count as u64);
    }

    pub fn interval_inversion() {
        metrics::counter!(MetricName::PipelineIntervalInversions.as_str()).increment(1);
    }

    pub fn detection_failed() {
        metrics::counter!(MetricName::PipelineDetectionFailures.as_str()).increment(1);
    }

    pub fn duration(secs: f64) {
        metrics::histogram!(MetricName::PipelineDuration.as_str()).record(secs);
    }
}

//! Prometheus metrics for stream workers

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

use crate::error::StreamError;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() -> Result<(), StreamError> {
    PROMETHEUS_HANDLE.get_or_try_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| StreamError::Config(format!("failed to install Prometheus recorder: {e}")))?;
        info!("Prometheus metrics initialized");
        Ok::<_, StreamError>(handle)
    })?;
    Ok(())
}

pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Prometheus text exposition, empty before [`init_metrics`].
pub fn render_metrics() -> String {
    prometheus_handle().map(|h| h.render()).unwrap_or_default()
}

/// Per-stream metric helpers, labelled by stream and job type.
#[derive(Clone)]
pub struct StreamMetrics {
    stream_name: String,
}

impl StreamMetrics {
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
        }
    }

    pub fn job_started(&self, job_type: &str) {
        gauge!(
            "stream_jobs_in_flight",
            "stream" => self.stream_name.clone()
        )
        .increment(1.0);

        counter!(
            "stream_jobs_received_total",
            "stream" => self.stream_name.clone(),
            "job_type" => job_type.to_string()
        )
        .increment(1);
    }

    pub fn job_completed(&self, job_type: &str, duration: Duration) {
        self.job_finished(job_type, duration);
        counter!(
            "stream_jobs_processed_total",
            "stream" => self.stream_name.clone(),
            "job_type" => job_type.to_string()
        )
        .increment(1);
    }

    pub fn job_failed(&self, job_type: &str, duration: Duration) {
        self.job_finished(job_type, duration);
        counter!(
            "stream_jobs_failed_total",
            "stream" => self.stream_name.clone(),
            "job_type" => job_type.to_string()
        )
        .increment(1);
    }

    pub fn fetch_failed(&self) {
        counter!(
            "stream_fetch_errors_total",
            "stream" => self.stream_name.clone()
        )
        .increment(1);
    }

    fn job_finished(&self, job_type: &str, duration: Duration) {
        gauge!(
            "stream_jobs_in_flight",
            "stream" => self.stream_name.clone()
        )
        .decrement(1.0);

        histogram!(
            "stream_job_duration_seconds",
            "stream" => self.stream_name.clone(),
            "job_type" => job_type.to_string()
        )
        .record(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_after_init() {
        init_metrics().unwrap();
        init_metrics().unwrap();

        let metrics = StreamMetrics::new("test:metrics");
        metrics.job_started("SEND_CONFIRMATION_EMAIL");
        metrics.job_completed("SEND_CONFIRMATION_EMAIL", Duration::from_millis(12));
        metrics.job_started("SEND_CONFIRMATION_SMS");
        metrics.job_failed("SEND_CONFIRMATION_SMS", Duration::from_millis(1));

        let rendered = render_metrics();
        assert!(rendered.contains("stream_jobs_processed_total"));
        assert!(rendered.contains("stream_jobs_failed_total"));
    }
}

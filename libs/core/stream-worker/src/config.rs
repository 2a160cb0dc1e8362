//! Worker configuration

use crate::registry::StreamDef;

/// Configuration for [`StreamWorker`](crate::StreamWorker) and its consumer.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub stream_name: String,

    pub consumer_group: String,

    /// Unique within the group and stable across restarts; pending entries
    /// are tracked per consumer and replayed only to the same name
    pub consumer_name: String,

    /// Approximate stream cap used by producers
    pub max_length: i64,

    /// Upper bound on entries read per fetch
    pub batch_size: usize,

    /// XREADGROUP BLOCK timeout
    pub block_timeout_ms: u64,

    pub max_concurrent_jobs: usize,

    /// First delay after a failed fetch, doubled per consecutive failure
    pub error_backoff_ms: u64,

    pub max_error_backoff_ms: u64,
}

impl WorkerConfig {
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self {
            max_length: S::MAX_LENGTH,
            max_concurrent_jobs: S::CONCURRENCY.max(1),
            ..Self::new(S::STREAM_NAME, S::CONSUMER_GROUP)
        }
    }

    pub fn new(stream_name: impl Into<String>, consumer_group: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            consumer_group: consumer_group.into(),
            consumer_name: default_consumer_name(),
            max_length: 100_000,
            batch_size: 10,
            block_timeout_ms: 5000,
            max_concurrent_jobs: 5,
            error_backoff_ms: 1000,
            max_error_backoff_ms: 30_000,
        }
    }

    pub fn with_consumer_name(mut self, name: impl Into<String>) -> Self {
        self.consumer_name = name.into();
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_block_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.block_timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_concurrent_jobs(mut self, count: usize) -> Self {
        self.max_concurrent_jobs = count.max(1);
        self
    }

    pub fn with_error_backoff_ms(mut self, initial: u64, max: u64) -> Self {
        self.error_backoff_ms = initial;
        self.max_error_backoff_ms = max.max(initial);
        self
    }
}

// HOSTNAME is the pod name under Kubernetes, so a restarted pod reclaims its own PEL.
fn default_consumer_name() -> String {
    std::env::var("WORKER_CONSUMER_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "worker".to_string())
}

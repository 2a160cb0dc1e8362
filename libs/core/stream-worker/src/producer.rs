//! Redis Streams producer.
//!
//! ```rust,ignore
//! let producer = StreamProducer::from_stream_def::<NotificationStream>(redis);
//! let id = producer.add(job.name(), &job).await?;
//! ```

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use crate::error::StreamError;
use crate::queue::JobQueue;
use crate::registry::{MessageKey, StreamDef, StreamJob};

/// Appends jobs to a stream with `XADD ... MAXLEN ~`.
#[derive(Clone)]
pub struct StreamProducer {
    redis: ConnectionManager,
    stream_name: String,
    max_length: i64,
}

impl StreamProducer {
    pub fn new(redis: ConnectionManager, stream_name: impl Into<String>) -> Self {
        Self {
            redis,
            stream_name: stream_name.into(),
            max_length: 100_000,
        }
    }

    /// Keeps stream name and cap in line with the worker's definition.
    pub fn from_stream_def<S: StreamDef>(redis: ConnectionManager) -> Self {
        Self::new(redis, S::STREAM_NAME).with_max_length(S::MAX_LENGTH)
    }

    pub fn with_max_length(mut self, max_length: i64) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    fn xadd(&self, name: &str, job_json: &str) -> redis::Cmd {
        let mut cmd = redis::cmd("XADD");
        cmd.arg(&self.stream_name)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg(MessageKey::Name.as_ref())
            .arg(name)
            .arg(MessageKey::Job.as_ref())
            .arg(job_json);
        cmd
    }
}

#[async_trait]
impl<J: StreamJob> JobQueue<J> for StreamProducer {
    async fn add(&self, name: &str, job: &J) -> Result<String, StreamError> {
        let job_json = serde_json::to_string(job)?;
        let mut conn = self.redis.clone();

        let id: String = self.xadd(name, &job_json).query_async(&mut conn).await?;

        debug!(
            stream = %self.stream_name,
            id = %id,
            name,
            job_id = %job.job_id(),
            "Enqueued job"
        );

        Ok(id)
    }
}

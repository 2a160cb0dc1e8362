//! Job, processor and stream definitions shared by producers and workers.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use strum::{AsRefStr, Display, EnumString};

use crate::error::StreamError;

/// A unit of deferred work carried through a stream.
///
/// `name()` is the job-type tag. It is written next to the payload so a
/// consumer can route or filter without deserializing first.
pub trait StreamJob: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Identifier used in logs and job reports.
    fn job_id(&self) -> String;

    /// Job-type tag, e.g. `SEND_CONFIRMATION_EMAIL`.
    fn name(&self) -> &'static str;
}

/// Handles one job. Returning `Err` marks the job failed; the worker does not
/// retry it.
#[async_trait]
pub trait StreamProcessor<J: StreamJob>: Send + Sync {
    async fn process(&self, job: &J) -> Result<(), StreamError>;

    /// Processor name for logs and metrics labels.
    fn name(&self) -> &'static str;

    async fn health_check(&self) -> Result<bool, StreamError> {
        Ok(true)
    }
}

/// Field names used in stream entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKey {
    /// Job-type tag
    Name,
    /// JSON-serialized job
    Job,
}

/// Static description of a queue.
///
/// ```rust,ignore
/// pub struct NotificationStream;
///
/// impl StreamDef for NotificationStream {
///     const STREAM_NAME: &'static str = "notifications";
///     const CONSUMER_GROUP: &'static str = "notification_workers";
/// }
/// ```
pub trait StreamDef: Send + Sync {
    const STREAM_NAME: &'static str;

    const CONSUMER_GROUP: &'static str;

    /// Approximate cap applied on every XADD (`MAXLEN ~`).
    const MAX_LENGTH: i64 = 100_000;

    /// Jobs a single worker process may run at once.
    const CONCURRENCY: usize = 5;

    fn stream_name() -> &'static str {
        Self::STREAM_NAME
    }

    fn consumer_group() -> &'static str {
        Self::CONSUMER_GROUP
    }
}

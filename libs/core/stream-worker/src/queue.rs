//! Producer and consumer seams.
//!
//! Domain code depends on these traits rather than on Redis, so dispatch and
//! worker logic can run against [`InMemoryQueue`](crate::InMemoryQueue).

use async_trait::async_trait;

use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::registry::StreamJob;

/// Producer side of a named queue.
#[async_trait]
pub trait JobQueue<J: StreamJob>: Send + Sync {
    /// Enqueue `job` under the routing key `name`.
    ///
    /// Resolves once the broker accepted the entry and returns its id. Delivery
    /// happens later and is never reported back here.
    async fn add(&self, name: &str, job: &J) -> Result<String, StreamError>;
}

/// Consumer side of a named queue.
#[async_trait]
pub trait JobSource<J: StreamJob>: Send + Sync {
    /// One-time setup before the first fetch (consumer group creation etc).
    async fn prepare(&self) -> Result<(), StreamError> {
        Ok(())
    }

    /// Claim up to `max` entries. May wait for a bounded time and return an
    /// empty batch.
    async fn fetch(&self, max: usize) -> Result<Vec<StreamEvent<J>>, StreamError>;

    /// Mark an entry as handled so it is never delivered again.
    async fn ack(&self, id: &str) -> Result<(), StreamError>;
}

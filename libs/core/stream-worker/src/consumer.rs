//! Redis Streams consumer-group reader.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamId, StreamReadReply};
use redis::{AsyncCommands, RedisResult};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::queue::JobSource;
use crate::registry::{MessageKey, StreamJob};

/// Reads a stream through a consumer group.
///
/// The first fetches replay this consumer's pending entry list (entries
/// delivered before a crash but never acknowledged), then switch to new
/// entries with `>`. Delivery is therefore at-least-once.
pub struct StreamConsumer {
    redis: ConnectionManager,
    config: WorkerConfig,
    /// Position inside the pending list while replaying it, `None` once done.
    pending_cursor: Mutex<Option<String>>,
}

impl StreamConsumer {
    pub fn new(redis: ConnectionManager, config: WorkerConfig) -> Self {
        Self {
            redis,
            config,
            pending_cursor: Mutex::new(Some("0".to_string())),
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.config.stream_name
    }

    pub fn consumer_group(&self) -> &str {
        &self.config.consumer_group
    }

    pub fn consumer_name(&self) -> &str {
        &self.config.consumer_name
    }

    /// `XGROUP CREATE ... $ MKSTREAM`, tolerating an existing group.
    pub async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(()) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
                Ok(())
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(group = %self.config.consumer_group, "Consumer group already exists");
                Ok(())
            }
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    async fn read_pending(&self, after: &str, count: usize) -> Result<StreamReadReply, StreamError> {
        let mut conn = self.redis.clone();

        let reply: StreamReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_name)
            .arg("COUNT")
            .arg(count)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(after)
            .query_async(&mut conn)
            .await?;

        Ok(reply)
    }

    async fn read_new(&self, count: usize) -> Result<StreamReadReply, StreamError> {
        let mut conn = self.redis.clone();

        // BLOCK answers nil on timeout
        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_name)
            .arg("BLOCK")
            .arg(self.config.block_timeout_ms)
            .arg("COUNT")
            .arg(count)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">")
            .query_async(&mut conn)
            .await?;

        Ok(reply.unwrap_or_default())
    }

    /// Entries whose job cannot be decoded are acknowledged and skipped. They
    /// would fail identically on every redelivery.
    async fn decode<J: StreamJob>(&self, reply: StreamReadReply) -> Vec<StreamEvent<J>> {
        let mut events = Vec::new();

        for entry in reply.keys.into_iter().flat_map(|key| key.ids) {
            match parse_entry::<J>(&entry) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "Discarding unreadable stream entry");
                    if let Err(ack_err) = self.xack(&entry.id).await {
                        warn!(id = %entry.id, error = %ack_err, "Failed to acknowledge unreadable entry");
                    }
                }
            }
        }

        events
    }

    async fn xack(&self, id: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();
        let _: i64 = conn
            .xack(&self.config.stream_name, &self.config.consumer_group, &[id])
            .await?;
        Ok(())
    }

    pub async fn stream_info(&self) -> Result<StreamInfo, StreamError> {
        stream_info(&mut self.redis.clone(), &self.config.stream_name, &self.config.consumer_group).await
    }
}

#[async_trait]
impl<J: StreamJob> JobSource<J> for StreamConsumer {
    async fn prepare(&self) -> Result<(), StreamError> {
        self.ensure_consumer_group().await
    }

    async fn fetch(&self, max: usize) -> Result<Vec<StreamEvent<J>>, StreamError> {
        let count = max.clamp(1, self.config.batch_size.max(1));

        let mut cursor = self.pending_cursor.lock().await;
        if let Some(after) = cursor.clone() {
            let reply = self.read_pending(&after, count).await?;
            let last = reply.keys.iter().flat_map(|k| k.ids.iter()).last().map(|e| e.id.clone());

            match last {
                Some(last) => {
                    *cursor = Some(last);
                    let events = self.decode(reply).await;
                    if !events.is_empty() {
                        info!(count = events.len(), "Replaying pending entries");
                        return Ok(events);
                    }
                }
                None => {
                    debug!(consumer = %self.config.consumer_name, "Pending list drained");
                    *cursor = None;
                }
            }
            return Ok(Vec::new());
        }
        drop(cursor);

        match self.read_new(count).await {
            Ok(reply) => Ok(self.decode(reply).await),
            Err(e) if e.is_nogroup_error() => {
                warn!("Consumer group missing, recreating");
                self.ensure_consumer_group().await?;
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn ack(&self, id: &str) -> Result<(), StreamError> {
        self.xack(id).await?;
        debug!(id, "Acknowledged entry");
        Ok(())
    }
}

fn parse_entry<J: StreamJob>(entry: &StreamId) -> Result<StreamEvent<J>, StreamError> {
    let json: String = entry
        .get(MessageKey::Job.as_ref())
        .ok_or_else(|| StreamError::Internal(format!("entry {} has no job field", entry.id)))?;
    let job: J = serde_json::from_str(&json)?;

    // Entries written by older producers carry no name; fall back to the job.
    let name: String = entry
        .get(MessageKey::Name.as_ref())
        .unwrap_or_else(|| job.name().to_string());

    Ok(StreamEvent::new(entry.id.clone(), name, job))
}

/// XLEN of the stream and the group's pending count. A missing stream or
/// group reads as zero.
pub async fn stream_info(
    conn: &mut ConnectionManager,
    stream_name: &str,
    consumer_group: &str,
) -> Result<StreamInfo, StreamError> {
    let length: i64 = conn.xlen(stream_name).await?;

    let pending: RedisResult<(i64, Option<String>, Option<String>, Option<Vec<(String, String)>>)> =
        redis::cmd("XPENDING")
            .arg(stream_name)
            .arg(consumer_group)
            .query_async(conn)
            .await;

    Ok(StreamInfo {
        stream_name: stream_name.to_string(),
        consumer_group: consumer_group.to_string(),
        length,
        pending_count: pending.map(|(count, ..)| count).unwrap_or(0),
    })
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StreamInfo {
    pub stream_name: String,
    pub consumer_group: String,
    pub length: i64,
    pub pending_count: i64,
}

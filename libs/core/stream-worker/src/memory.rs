//! In-process queue with the same wire format as the Redis stream.
//!
//! Jobs are serialized on `add` and deserialized on `fetch`, so a job that
//! cannot survive the trip through JSON fails here exactly as it would in
//! production.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::queue::{JobQueue, JobSource};
use crate::registry::StreamJob;

/// An entry as stored in the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEntry {
    pub id: String,
    pub name: String,
    pub payload: serde_json::Value,
}

#[derive(Default)]
struct State {
    last_ms: i64,
    seq: u64,
    ready: VecDeque<QueuedEntry>,
    delivered: HashMap<String, QueuedEntry>,
    history: Vec<QueuedEntry>,
    acked: Vec<String>,
}

impl State {
    fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis().max(self.last_ms);
        if now == self.last_ms {
            self.seq += 1;
        } else {
            self.last_ms = now;
            self.seq = 0;
        }
        format!("{}-{}", self.last_ms, self.seq)
    }
}

pub struct InMemoryQueue<J> {
    state: Mutex<State>,
    notify: Notify,
    available: AtomicBool,
    block: Duration,
    _job: PhantomData<fn() -> J>,
}

impl<J: StreamJob> InMemoryQueue<J> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
            available: AtomicBool::new(true),
            block: Duration::from_millis(50),
            _job: PhantomData,
        }
    }

    /// How long an empty `fetch` waits before returning nothing.
    pub fn with_block(mut self, block: Duration) -> Self {
        self.block = block;
        self
    }

    /// Simulate the broker going away. `add` and `fetch` fail while unavailable.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Every entry ever added, in order.
    pub async fn entries(&self) -> Vec<QueuedEntry> {
        self.state.lock().await.history.clone()
    }

    pub async fn acked(&self) -> Vec<String> {
        self.state.lock().await.acked.clone()
    }

    /// Entries not yet delivered to a consumer.
    pub async fn len(&self) -> usize {
        self.state.lock().await.ready.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Delivered entries still awaiting `ack`.
    pub async fn pending(&self) -> usize {
        self.state.lock().await.delivered.len()
    }

    fn ensure_available(&self) -> Result<(), StreamError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StreamError::Unavailable("in-memory queue is offline".to_string()))
        }
    }

    async fn take(&self, max: usize) -> Vec<StreamEvent<J>> {
        let mut state = self.state.lock().await;
        let mut events = Vec::new();

        while events.len() < max {
            let Some(entry) = state.ready.pop_front() else {
                break;
            };

            match serde_json::from_value::<J>(entry.payload.clone()) {
                Ok(job) => {
                    events.push(StreamEvent::new(&entry.id, &entry.name, job));
                    state.delivered.insert(entry.id.clone(), entry);
                }
                Err(e) => {
                    warn!(id = %entry.id, error = %e, "Dropping undecodable entry");
                    state.acked.push(entry.id);
                }
            }
        }

        events
    }
}

impl<J: StreamJob> Default for InMemoryQueue<J> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<J: StreamJob> JobQueue<J> for InMemoryQueue<J> {
    async fn add(&self, name: &str, job: &J) -> Result<String, StreamError> {
        self.ensure_available()?;
        let payload = serde_json::to_value(job)?;

        let mut state = self.state.lock().await;
        let id = state.next_id();
        let entry = QueuedEntry {
            id: id.clone(),
            name: name.to_string(),
            payload,
        };
        state.ready.push_back(entry.clone());
        state.history.push(entry);
        drop(state);

        debug!(id = %id, name, "Enqueued job in memory");
        self.notify.notify_one();
        Ok(id)
    }
}

#[async_trait]
impl<J: StreamJob> JobSource<J> for InMemoryQueue<J> {
    async fn fetch(&self, max: usize) -> Result<Vec<StreamEvent<J>>, StreamError> {
        self.ensure_available()?;

        let events = self.take(max.max(1)).await;
        if !events.is_empty() {
            return Ok(events);
        }

        // Nothing ready: wait like BLOCK does, then try once more.
        let _ = tokio::time::timeout(self.block, self.notify.notified()).await;
        self.ensure_available()?;
        Ok(self.take(max.max(1)).await)
    }

    async fn ack(&self, id: &str) -> Result<(), StreamError> {
        let mut state = self.state.lock().await;
        if state.delivered.remove(id).is_some() {
            state.acked.push(id.to_string());
        }
        Ok(())
    }
}

//! Stream Worker Framework
//!
//! Durable job queues on Redis Streams with a bounded-concurrency worker.
//!
//! - `JobQueue` / `JobSource`: producer and consumer seams
//! - `StreamProducer` / `StreamConsumer`: Redis implementations (XADD, XREADGROUP)
//! - `InMemoryQueue`: in-process implementation of both, same wire format
//! - `StreamWorker`: claims jobs, runs each once, acknowledges, reports
//!
//! Jobs are attempted exactly once per delivery. There is no retry policy and
//! no dead-letter stream; a failure is logged and acknowledged.
//!
//! ```ignore
//! use stream_worker::{StreamConsumer, StreamWorker, WorkerConfig};
//!
//! let config = WorkerConfig::from_stream_def::<NotificationStream>();
//! let consumer = StreamConsumer::new(redis, config.clone());
//! let worker = StreamWorker::new(consumer, processor, config);
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod error;
mod event;
mod health;
mod memory;
pub mod metrics;
mod producer;
mod queue;
mod registry;
mod worker;

pub use config::WorkerConfig;
pub use consumer::{StreamConsumer, StreamInfo};
pub use error::StreamError;
pub use event::StreamEvent;
pub use health::{HealthState, health_router};
pub use memory::{InMemoryQueue, QueuedEntry};
pub use metrics::{StreamMetrics, init_metrics};
pub use producer::StreamProducer;
pub use queue::{JobQueue, JobSource};
pub use registry::{MessageKey, StreamDef, StreamJob, StreamProcessor};
pub use worker::{JobOutcome, JobReport, StreamWorker};

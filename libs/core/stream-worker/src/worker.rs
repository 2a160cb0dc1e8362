//! Bounded-concurrency worker loop.
//!
//! Each claimed entry moves through Pending → Processing → Completed | Failed
//! and is acknowledged after exactly one attempt, whatever the outcome.
//! Nothing is retried or parked in a dead-letter stream.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::StreamError;
use crate::event::StreamEvent;
use crate::metrics::StreamMetrics;
use crate::queue::JobSource;
use crate::registry::{StreamJob, StreamProcessor};

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Handler error message
    Failed(String),
}

/// Emitted once per job when an outcome sender is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub id: String,
    pub job_id: String,
    pub name: String,
    pub outcome: JobOutcome,
}

/// Pulls jobs from a [`JobSource`] and runs them through a [`StreamProcessor`]
/// with at most `max_concurrent_jobs` in flight.
pub struct StreamWorker<J, P, S>
where
    J: StreamJob,
    P: StreamProcessor<J>,
    S: JobSource<J>,
{
    source: Arc<S>,
    processor: Arc<P>,
    config: WorkerConfig,
    slots: Arc<Semaphore>,
    metrics: StreamMetrics,
    reports: Option<mpsc::UnboundedSender<JobReport>>,
    _job: PhantomData<fn() -> J>,
}

impl<J, P, S> StreamWorker<J, P, S>
where
    J: StreamJob,
    P: StreamProcessor<J> + 'static,
    S: JobSource<J> + 'static,
{
    pub fn new(source: S, processor: P, config: WorkerConfig) -> Self {
        Self::from_arcs(Arc::new(source), Arc::new(processor), config)
    }

    pub fn from_arcs(source: Arc<S>, processor: Arc<P>, config: WorkerConfig) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1))),
            metrics: StreamMetrics::new(&config.stream_name),
            source,
            processor,
            config,
            reports: None,
            _job: PhantomData,
        }
    }

    /// Receive a [`JobReport`] for every finished job.
    pub fn with_outcome_sender(mut self, sender: mpsc::UnboundedSender<JobReport>) -> Self {
        self.reports = Some(sender);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// On shutdown no new entries are claimed; jobs already running are
    /// awaited before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            consumer = %self.config.consumer_name,
            processor = self.processor.name(),
            max_concurrent_jobs = self.config.max_concurrent_jobs,
            "Starting stream worker"
        );

        self.source.prepare().await?;

        let mut running: JoinSet<()> = JoinSet::new();
        let mut consecutive_errors: u32 = 0;

        loop {
            while let Some(joined) = running.try_join_next() {
                log_join_error(joined);
            }

            if *shutdown.borrow() {
                break;
            }

            // Wait for a free slot before claiming anything.
            let permit = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                permit = self.slots.clone().acquire_owned() => {
                    permit.map_err(|e| StreamError::Internal(e.to_string()))?
                }
            };

            let max = (self.slots.available_permits() + 1).min(self.config.batch_size);

            let fetched = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                fetched = self.source.fetch(max) => fetched,
            };

            let events = match fetched {
                Ok(events) => {
                    if consecutive_errors > 0 {
                        info!(consecutive_errors, "Queue connection recovered");
                        consecutive_errors = 0;
                    }
                    events
                }
                Err(e) => {
                    drop(permit);
                    consecutive_errors += 1;
                    self.metrics.fetch_failed();

                    let delay = backoff_delay(&self.config, consecutive_errors);
                    if e.is_connection_error() {
                        warn!(error = %e, consecutive_errors, backoff_ms = delay.as_millis() as u64, "Queue unavailable, backing off");
                    } else {
                        error!(error = %e, consecutive_errors, backoff_ms = delay.as_millis() as u64, "Failed to fetch jobs");
                    }

                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    continue;
                }
            };

            if events.is_empty() {
                continue;
            }

            debug!(count = events.len(), "Claimed jobs");

            let mut first = Some(permit);
            for event in events {
                let permit = match first.take() {
                    Some(permit) => permit,
                    None => self
                        .slots
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|e| StreamError::Internal(e.to_string()))?,
                };

                running.spawn(process_event(
                    Arc::clone(&self.source),
                    Arc::clone(&self.processor),
                    self.metrics.clone(),
                    self.reports.clone(),
                    event,
                    permit,
                ));
            }
        }

        if !running.is_empty() {
            info!(in_flight = running.len(), "Waiting for in-flight jobs");
        }
        while let Some(joined) = running.join_next().await {
            log_join_error(joined);
        }

        info!(stream = %self.config.stream_name, "Stream worker stopped");
        Ok(())
    }
}

async fn process_event<J, P, S>(
    source: Arc<S>,
    processor: Arc<P>,
    metrics: StreamMetrics,
    reports: Option<mpsc::UnboundedSender<JobReport>>,
    event: StreamEvent<J>,
    _permit: OwnedSemaphorePermit,
) where
    J: StreamJob,
    P: StreamProcessor<J>,
    S: JobSource<J>,
{
    let job_id = event.job_id();
    let name = event.name.clone();

    info!(job_id = %job_id, job_type = %name, id = %event.id, queued_ms = event.age().num_milliseconds(), "Processing job");
    metrics.job_started(&name);
    let started = Instant::now();

    let outcome = match processor.process(&event.job).await {
        Ok(()) => {
            metrics.job_completed(&name, started.elapsed());
            info!(job_id = %job_id, job_type = %name, elapsed_ms = started.elapsed().as_millis() as u64, "Job completed");
            JobOutcome::Completed
        }
        Err(e) => {
            metrics.job_failed(&name, started.elapsed());
            error!(job_id = %job_id, job_type = %name, error = %e, "Job failed");
            JobOutcome::Failed(e.to_string())
        }
    };

    if let Err(e) = source.ack(&event.id).await {
        // The entry stays pending and is replayed on the next start.
        warn!(job_id = %job_id, id = %event.id, error = %e, "Failed to acknowledge job");
    }

    if let Some(reports) = reports {
        let _ = reports.send(JobReport {
            id: event.id,
            job_id,
            name,
            outcome,
        });
    }
}

fn log_join_error(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Job task aborted");
    }
}

/// `error_backoff_ms * 2^(n-1)`, capped at `max_error_backoff_ms`.
pub(crate) fn backoff_delay(config: &WorkerConfig, consecutive_errors: u32) -> Duration {
    let exponent = consecutive_errors.saturating_sub(1).min(16);
    let delay = config
        .error_backoff_ms
        .saturating_mul(1u64 << exponent)
        .min(config.max_error_backoff_ms);
    Duration::from_millis(delay)
}

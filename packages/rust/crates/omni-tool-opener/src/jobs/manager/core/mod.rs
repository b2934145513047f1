//! Core runtime for timed open → close jobs.

mod metrics;
mod runtime;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};

use crate::driver::PlatformDriver;
use crate::error::StartError;
use crate::jobs::manager::types::{
    DurationPolicy, LifecycleManagerConfig, QueuedJob, epoch_millis,
};
use crate::jobs::record::{JobHandle, JobRecord};

/// Accepts jobs, runs each one on the worker pool, and keeps their records for status queries.
pub struct LifecycleManager {
    queue_tx: mpsc::Sender<QueuedJob>,
    records: Arc<RwLock<HashMap<String, JobHandle>>>,
    next_job_seq: AtomicU64,
    config: LifecycleManagerConfig,
}

impl LifecycleManager {
    /// Start the dispatch loop. Must be called inside a Tokio runtime.
    pub fn start(driver: Arc<dyn PlatformDriver>, config: LifecycleManagerConfig) -> Arc<Self> {
        let config = config.normalized();
        let (queue_tx, queue_rx) = mpsc::channel::<QueuedJob>(config.queue_capacity);

        let manager = Arc::new(Self {
            queue_tx,
            records: Arc::new(RwLock::new(HashMap::new())),
            next_job_seq: AtomicU64::new(0),
            config,
        });

        Self::spawn_dispatch_loop(driver, queue_rx, manager.config.max_in_flight);
        tracing::info!(
            queue_capacity = manager.config.queue_capacity,
            max_in_flight = manager.config.max_in_flight,
            max_duration_secs = manager.config.max_duration_secs,
            "lifecycle manager started"
        );
        manager
    }

    /// Effective config after normalization.
    #[must_use]
    pub fn config(&self) -> &LifecycleManagerConfig {
        &self.config
    }

    /// Open `location` now and close it after `duration`. Returns without waiting on either.
    pub async fn start_job(
        &self,
        location: &str,
        duration: Duration,
    ) -> Result<JobHandle, StartError> {
        self.submit(None, location, duration).await
    }

    /// Same as `start_job`, recording the catalog name for status output.
    pub async fn start_tool(
        &self,
        tool: &str,
        location: &str,
        duration: Duration,
    ) -> Result<JobHandle, StartError> {
        self.submit(Some(tool.to_string()), location, duration).await
    }

    async fn submit(
        &self,
        tool: Option<String>,
        location: &str,
        duration: Duration,
    ) -> Result<JobHandle, StartError> {
        let duration = self.effective_duration(duration)?;

        let permit = match self.queue_tx.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => {
                tracing::warn!(
                    queue_capacity = self.config.queue_capacity,
                    "rejecting job: queue is full"
                );
                return Err(StartError::AtCapacity {
                    limit: self.config.queue_capacity,
                });
            }
            Err(TrySendError::Closed(())) => return Err(StartError::Closed),
        };

        let (seq, job_id) = self.next_job_id();
        let record = JobRecord::new(seq, job_id.clone(), tool, location, duration);
        let handle = record.handle();
        {
            let mut records = self.records.write().await;
            records.insert(job_id.clone(), handle.clone());
            self.prune_finished(&mut records).await;
        }
        permit.send(QueuedJob { record });

        tracing::info!(
            %job_id,
            tool = handle.tool().unwrap_or("-"),
            location = %handle.location(),
            duration_secs = duration.as_secs(),
            "job accepted"
        );
        Ok(handle)
    }

    fn effective_duration(&self, requested: Duration) -> Result<Duration, StartError> {
        let max = self.config.max_duration();
        if requested <= max {
            return Ok(requested);
        }
        match self.config.duration_policy {
            DurationPolicy::Clamp => {
                tracing::warn!(
                    requested_secs = requested.as_secs(),
                    max_secs = max.as_secs(),
                    "clamping job duration to maximum"
                );
                Ok(max)
            }
            DurationPolicy::Reject => Err(StartError::DurationExceeded {
                requested_secs: requested.as_secs(),
                max_secs: max.as_secs(),
            }),
        }
    }

    /// Drop the oldest terminal records beyond `retain_finished`. Live jobs are never dropped.
    async fn prune_finished(&self, records: &mut HashMap<String, JobHandle>) {
        let mut finished = Vec::new();
        for (job_id, handle) in records.iter() {
            let snapshot = handle.snapshot().await;
            if let Some(finished_at) = snapshot.finished_at {
                finished.push((finished_at, snapshot.seq, job_id.clone()));
            }
        }
        if finished.len() <= self.config.retain_finished {
            return;
        }
        finished.sort();
        let excess = finished.len() - self.config.retain_finished;
        for (_, _, job_id) in finished.into_iter().take(excess) {
            records.remove(&job_id);
        }
        tracing::debug!(evicted = excess, "evicted finished job records");
    }

    fn next_job_id(&self) -> (u64, String) {
        let seq = self.next_job_seq.fetch_add(1, Ordering::Relaxed);
        (seq, format!("job-{}-{seq}", epoch_millis()))
    }
}

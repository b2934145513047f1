use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};

use crate::driver::PlatformDriver;
use crate::jobs::manager::types::QueuedJob;
use crate::jobs::record::{JobRecord, Phase};

use super::LifecycleManager;

impl LifecycleManager {
    pub(super) fn spawn_dispatch_loop(
        driver: Arc<dyn PlatformDriver>,
        mut queue_rx: mpsc::Receiver<QueuedJob>,
        max_in_flight: usize,
    ) {
        tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(max_in_flight));
            let mut workers = JoinSet::new();
            let mut worker_jobs = HashMap::new();

            while let Some(job) = queue_rx.recv().await {
                let permit = match Arc::clone(&semaphore).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let job_id = job.record.job_id().to_string();
                let worker_driver = Arc::clone(&driver);
                let abort = workers.spawn(async move {
                    let _permit = permit;
                    let record = Arc::new(job.record);
                    let lifecycle_record = Arc::clone(&record);
                    let lifecycle = tokio::spawn(async move {
                        run_lifecycle(worker_driver.as_ref(), &lifecycle_record).await;
                    });
                    if let Err(error) = lifecycle.await {
                        fail_crashed(&record, &error).await;
                    }
                });
                worker_jobs.insert(abort.id(), job_id);

                while let Some(result) = workers.try_join_next_with_id() {
                    reap_worker(&mut worker_jobs, result);
                }
            }

            while let Some(result) = workers.join_next_with_id().await {
                reap_worker(&mut worker_jobs, result);
            }
        });
    }
}

fn reap_worker(
    worker_jobs: &mut HashMap<tokio::task::Id, String>,
    result: Result<(tokio::task::Id, ()), JoinError>,
) {
    match result {
        Ok((id, ())) => {
            worker_jobs.remove(&id);
        }
        Err(error) => {
            let job_id = worker_jobs.remove(&error.id()).unwrap_or_default();
            tracing::error!(%job_id, "job worker crashed: {error}");
        }
    }
}

/// A lifecycle task that panicked or was cancelled still owes its record a terminal phase.
async fn fail_crashed(record: &JobRecord, error: &JoinError) {
    tracing::error!(job_id = %record.job_id(), "job lifecycle crashed: {error}");
    if record.snapshot().await.phase.is_terminal() {
        return;
    }
    apply(record, Phase::Failed, Some(format!("job worker crashed: {error}"))).await;
}

/// Open → wait → close for one job. Every outcome lands on `record`; nothing is returned or retried.
async fn run_lifecycle(driver: &dyn PlatformDriver, record: &JobRecord) {
    let job_id = record.job_id();

    if !driver.is_supported() {
        let reason = driver.unsupported_reason();
        tracing::warn!(%job_id, driver = driver.name(), %reason, "platform unsupported");
        apply(record, Phase::Failed, Some(reason)).await;
        return;
    }

    if let Err(error) = driver.activate(record.location()).await {
        tracing::warn!(%job_id, location = %record.location(), %error, "activate failed");
        apply(record, Phase::Failed, Some(error.to_string())).await;
        return;
    }
    apply(record, Phase::Active, None).await;
    tracing::info!(
        %job_id,
        location = %record.location(),
        duration_secs = record.duration().as_secs(),
        "view opened"
    );

    tokio::time::sleep(record.duration()).await;

    match driver.deactivate().await {
        Ok(()) => {
            apply(record, Phase::Closed, None).await;
            tracing::info!(%job_id, "view closed");
        }
        Err(error) => {
            // View may still be open; no retry.
            tracing::warn!(%job_id, %error, "deactivate failed");
            apply(record, Phase::Failed, Some(error.to_string())).await;
        }
    }
}

async fn apply(record: &JobRecord, phase: Phase, error: Option<String>) {
    if let Err(transition_error) = record.transition_to(phase, error).await {
        tracing::error!(
            job_id = %record.job_id(),
            error = %transition_error,
            "rejected job transition"
        );
    }
}

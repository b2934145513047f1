use crate::jobs::manager::types::JobMetricsSnapshot;
use crate::jobs::record::{JobHandle, JobSnapshot, Phase};

use super::LifecycleManager;

impl LifecycleManager {
    /// Query one job.
    pub async fn get_status(&self, job_id: &str) -> Option<JobSnapshot> {
        let handle = self.handle(job_id).await?;
        Some(handle.snapshot().await)
    }

    /// Read-only handle for one tracked job.
    pub async fn handle(&self, job_id: &str) -> Option<JobHandle> {
        self.records.read().await.get(job_id).cloned()
    }

    /// All tracked jobs, oldest first.
    pub async fn list(&self) -> Vec<JobSnapshot> {
        let records = self.records.read().await;
        let mut snapshots = Vec::with_capacity(records.len());
        for handle in records.values() {
            snapshots.push(handle.snapshot().await);
        }
        snapshots.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.seq.cmp(&b.seq))
        });
        snapshots
    }

    /// Aggregate counts for `/health`.
    pub async fn metrics(&self) -> JobMetricsSnapshot {
        let records = self.records.read().await;

        let mut snapshot = JobMetricsSnapshot {
            total_jobs: records.len(),
            queue_capacity: self.config.queue_capacity,
            max_in_flight: self.config.max_in_flight,
            ..JobMetricsSnapshot::default()
        };
        for handle in records.values() {
            match handle.snapshot().await.phase {
                Phase::Pending => snapshot.pending += 1,
                Phase::Active => snapshot.active += 1,
                Phase::Closed => snapshot.closed += 1,
                Phase::Failed => snapshot.failed += 1,
            }
        }
        snapshot
    }
}

//! Job record: the status cell of one open → wait → close lifecycle.
//!
//! The write side (`JobRecord`) is not `Clone` and is moved into the job's
//! worker. Everyone else gets a `JobHandle`, which can only take snapshots.
//! Phase, error and timestamps live behind one lock so a snapshot never mixes
//! two states.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Notify, RwLock};
use tokio::time::Instant;

use crate::error::TransitionError;

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Accepted, view not opened yet.
    Pending,
    /// View opened; waiting out the duration.
    Active,
    /// View closed after the duration.
    Closed,
    /// Unsupported host or driver failure.
    Failed,
}

impl Phase {
    /// `Closed` and `Failed` accept no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Failed)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Closed => "closed",
            Self::Failed => "failed",
        }
    }

    fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active | Self::Failed) | (Self::Active, Self::Closed | Self::Failed)
        )
    }
}

/// Consistent read of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub location: String,
    /// Effective duration in seconds (after clamping).
    pub duration: u64,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds since the job was accepted.
    pub age_secs: u64,
    /// Seconds since the view was opened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_age_secs: Option<u64>,
    /// Seconds since the job reached a terminal phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_age_secs: Option<u64>,
    /// Acceptance order within this process.
    #[serde(skip)]
    pub seq: u64,
    #[serde(skip)]
    pub created_at: Instant,
    #[serde(skip)]
    pub activated_at: Option<Instant>,
    #[serde(skip)]
    pub finished_at: Option<Instant>,
}

#[derive(Debug)]
struct JobCell {
    phase: Phase,
    error: Option<String>,
    created_at: Instant,
    activated_at: Option<Instant>,
    finished_at: Option<Instant>,
}

#[derive(Debug)]
struct JobShared {
    seq: u64,
    job_id: String,
    tool: Option<String>,
    location: String,
    duration: Duration,
    cell: RwLock<JobCell>,
    changed: Notify,
}

impl JobShared {
    async fn snapshot(&self) -> JobSnapshot {
        let now = Instant::now();
        let cell = self.cell.read().await;
        JobSnapshot {
            job_id: self.job_id.clone(),
            seq: self.seq,
            tool: self.tool.clone(),
            location: self.location.clone(),
            duration: self.duration.as_secs(),
            phase: cell.phase,
            error: cell.error.clone(),
            age_secs: elapsed_secs_from(now, cell.created_at),
            active_age_secs: cell.activated_at.map(|t| elapsed_secs_from(now, t)),
            finished_age_secs: cell.finished_at.map(|t| elapsed_secs_from(now, t)),
            created_at: cell.created_at,
            activated_at: cell.activated_at,
            finished_at: cell.finished_at,
        }
    }
}

/// Write side of a job. Owned by exactly one worker.
#[derive(Debug)]
pub struct JobRecord {
    shared: Arc<JobShared>,
}

impl JobRecord {
    /// New record in `Pending`. `seq` orders records accepted at the same instant.
    #[must_use]
    pub fn new(
        seq: u64,
        job_id: impl Into<String>,
        tool: Option<String>,
        location: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(JobShared {
                seq,
                job_id: job_id.into(),
                tool,
                location: location.into(),
                duration,
                cell: RwLock::new(JobCell {
                    phase: Phase::Pending,
                    error: None,
                    created_at: Instant::now(),
                    activated_at: None,
                    finished_at: None,
                }),
                changed: Notify::new(),
            }),
        }
    }

    /// Read-only view for status queries.
    #[must_use]
    pub fn handle(&self) -> JobHandle {
        JobHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.shared.job_id
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.shared.location
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.shared.duration
    }

    /// Advance the phase. `error` must be non-empty exactly when `phase` is `Failed`.
    pub async fn transition_to(
        &self,
        phase: Phase,
        error: Option<String>,
    ) -> Result<(), TransitionError> {
        {
            let mut cell = self.shared.cell.write().await;
            if cell.phase.is_terminal() {
                return Err(TransitionError::Terminal {
                    current: cell.phase,
                    requested: phase,
                });
            }
            let has_error = error.as_deref().is_some_and(|e| !e.trim().is_empty());
            if has_error != (phase == Phase::Failed) {
                return Err(TransitionError::ErrorMismatch { requested: phase });
            }
            if !cell.phase.can_advance_to(phase) {
                return Err(TransitionError::Illegal {
                    from: cell.phase,
                    to: phase,
                });
            }

            let now = Instant::now();
            cell.phase = phase;
            cell.error = error;
            match phase {
                Phase::Active => cell.activated_at = Some(now),
                Phase::Closed | Phase::Failed => cell.finished_at = Some(now),
                Phase::Pending => {}
            }
        }
        self.shared.changed.notify_waiters();
        Ok(())
    }

    pub async fn snapshot(&self) -> JobSnapshot {
        self.shared.snapshot().await
    }
}

/// Read side of a job. Cheap to clone; cannot change the record.
#[derive(Debug, Clone)]
pub struct JobHandle {
    shared: Arc<JobShared>,
}

impl JobHandle {
    #[must_use]
    pub fn job_id(&self) -> &str {
        &self.shared.job_id
    }

    #[must_use]
    pub fn tool(&self) -> Option<&str> {
        self.shared.tool.as_deref()
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.shared.location
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.shared.duration
    }

    /// Phase, error and timestamps read under one lock.
    pub async fn snapshot(&self) -> JobSnapshot {
        self.shared.snapshot().await
    }

    /// Wait until the job is `Closed` or `Failed`. Returns `None` if `timeout` elapses first.
    pub async fn wait_terminal(&self, timeout: Duration) -> Option<JobSnapshot> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register before reading so a transition in between is not missed.
            let changed = self.shared.changed.notified();
            let snapshot = self.snapshot().await;
            if snapshot.phase.is_terminal() {
                return Some(snapshot);
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return None;
            }
        }
    }
}

fn elapsed_secs_from(now: Instant, start: Instant) -> u64 {
    now.checked_duration_since(start)
        .map_or(0, |duration| duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> JobRecord {
        JobRecord::new(
            0,
            "job-test-0",
            Some("tasks".to_string()),
            "https://tasks.google.com/tasks/",
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn new_record_is_pending_without_error() {
        let record = record();
        let snapshot = record.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Pending);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.duration, 2);
        assert!(snapshot.activated_at.is_none());
    }

    #[tokio::test]
    async fn success_path_records_timestamps() {
        let record = record();
        record.transition_to(Phase::Active, None).await.unwrap();
        record.transition_to(Phase::Closed, None).await.unwrap();
        let snapshot = record.handle().snapshot().await;
        assert_eq!(snapshot.phase, Phase::Closed);
        assert!(snapshot.activated_at.is_some());
        assert!(snapshot.finished_at.is_some());
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn terminal_phases_reject_further_transitions() {
        let record = record();
        record
            .transition_to(Phase::Failed, Some("boom".to_string()))
            .await
            .unwrap();
        let err = record.transition_to(Phase::Active, None).await.unwrap_err();
        assert_eq!(
            err,
            TransitionError::Terminal {
                current: Phase::Failed,
                requested: Phase::Active
            }
        );
        let snapshot = record.snapshot().await;
        assert_eq!(snapshot.phase, Phase::Failed);
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn error_must_match_failed_phase() {
        let record = record();
        assert_eq!(
            record.transition_to(Phase::Failed, None).await.unwrap_err(),
            TransitionError::ErrorMismatch {
                requested: Phase::Failed
            }
        );
        assert_eq!(
            record
                .transition_to(Phase::Failed, Some("  ".to_string()))
                .await
                .unwrap_err(),
            TransitionError::ErrorMismatch {
                requested: Phase::Failed
            }
        );
        assert_eq!(
            record
                .transition_to(Phase::Active, Some("nope".to_string()))
                .await
                .unwrap_err(),
            TransitionError::ErrorMismatch {
                requested: Phase::Active
            }
        );
        assert_eq!(record.snapshot().await.phase, Phase::Pending);
    }

    #[tokio::test]
    async fn skipping_active_is_illegal() {
        let record = record();
        assert_eq!(
            record.transition_to(Phase::Closed, None).await.unwrap_err(),
            TransitionError::Illegal {
                from: Phase::Pending,
                to: Phase::Closed
            }
        );
        record.transition_to(Phase::Active, None).await.unwrap();
        assert_eq!(
            record.transition_to(Phase::Active, None).await.unwrap_err(),
            TransitionError::Illegal {
                from: Phase::Active,
                to: Phase::Active
            }
        );
    }

    #[tokio::test]
    async fn wait_terminal_wakes_on_transition() {
        let record = record();
        let handle = record.handle();
        let waiter = tokio::spawn(async move { handle.wait_terminal(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        record.transition_to(Phase::Active, None).await.unwrap();
        record.transition_to(Phase::Closed, None).await.unwrap();
        let snapshot = waiter.await.unwrap().expect("terminal snapshot");
        assert_eq!(snapshot.phase, Phase::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_terminal_times_out_for_live_job() {
        let record = record();
        let snapshot = record.handle().wait_terminal(Duration::from_secs(1)).await;
        assert!(snapshot.is_none());
    }

    #[test]
    fn snapshot_serializes_phase_in_snake_case() {
        let value = serde_json::to_value(Phase::Closed).unwrap();
        assert_eq!(value, serde_json::json!("closed"));
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Active.is_terminal());
    }
}

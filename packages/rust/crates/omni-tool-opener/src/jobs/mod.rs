//! Timed jobs: open a view now, close it after a fixed duration.

mod manager;
mod record;

pub use manager::{DurationPolicy, JobMetricsSnapshot, LifecycleManager, LifecycleManagerConfig};
pub use record::{JobHandle, JobRecord, JobSnapshot, Phase};

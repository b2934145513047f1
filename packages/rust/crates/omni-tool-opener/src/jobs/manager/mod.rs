//! Lifecycle manager: bounded queue, worker pool, timed close, status registry.

mod core;
mod types;

pub use core::LifecycleManager;
pub use types::{DurationPolicy, JobMetricsSnapshot, LifecycleManagerConfig};

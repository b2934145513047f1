//! Shared types and helpers for the lifecycle manager.

use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::jobs::record::JobRecord;

/// What to do with a requested duration above the configured maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPolicy {
    /// Shorten to the maximum and accept.
    #[default]
    Clamp,
    /// Refuse the request.
    Reject,
}

impl FromStr for DurationPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown duration policy `{other}` (expected `clamp` or `reject`)"
            )),
        }
    }
}

/// Config for the job queue and worker pool.
#[derive(Debug, Clone)]
pub struct LifecycleManagerConfig {
    /// Duration used when a request does not specify one.
    pub default_duration_secs: u64,
    /// Upper bound for any job duration.
    pub max_duration_secs: u64,
    /// Clamp or reject durations above `max_duration_secs`.
    pub duration_policy: DurationPolicy,
    /// Bounded queue size for accepted-but-not-started jobs.
    pub queue_capacity: usize,
    /// Maximum jobs running open → wait → close at once.
    pub max_in_flight: usize,
    /// Terminal records kept for status queries.
    pub retain_finished: usize,
}

impl Default for LifecycleManagerConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: 60,
            max_duration_secs: 3600,
            duration_policy: DurationPolicy::Clamp,
            queue_capacity: 64,
            max_in_flight: 16,
            retain_finished: 256,
        }
    }
}

impl LifecycleManagerConfig {
    pub(super) fn normalized(mut self) -> Self {
        self.max_duration_secs = self.max_duration_secs.max(1);
        self.default_duration_secs = self.default_duration_secs.min(self.max_duration_secs);
        self.queue_capacity = self.queue_capacity.max(1);
        self.max_in_flight = self.max_in_flight.max(1);
        self
    }

    #[must_use]
    pub fn default_duration(&self) -> Duration {
        Duration::from_secs(self.default_duration_secs)
    }

    #[must_use]
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_secs)
    }
}

/// Aggregate view over tracked jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobMetricsSnapshot {
    /// Jobs currently tracked in memory.
    pub total_jobs: usize,
    /// Count by phase.
    pub pending: usize,
    /// Count by phase.
    pub active: usize,
    /// Count by phase.
    pub closed: usize,
    /// Count by phase.
    pub failed: usize,
    /// Pending queue bound.
    pub queue_capacity: usize,
    /// Worker pool bound.
    pub max_in_flight: usize,
}

#[derive(Debug)]
pub(super) struct QueuedJob {
    pub(super) record: JobRecord,
}

pub(super) fn epoch_millis() -> u128 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis(),
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_policy_parses_case_insensitively() {
        assert_eq!("Clamp".parse::<DurationPolicy>(), Ok(DurationPolicy::Clamp));
        assert_eq!(" reject ".parse::<DurationPolicy>(), Ok(DurationPolicy::Reject));
        assert!("truncate".parse::<DurationPolicy>().is_err());
    }

    #[test]
    fn normalized_config_keeps_bounds_sane() {
        let config = LifecycleManagerConfig {
            default_duration_secs: 600,
            max_duration_secs: 0,
            queue_capacity: 0,
            max_in_flight: 0,
            ..LifecycleManagerConfig::default()
        }
        .normalized();
        assert_eq!(config.max_duration_secs, 1);
        assert_eq!(config.default_duration_secs, 1);
        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.max_in_flight, 1);
    }
}

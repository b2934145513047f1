#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use omni_tool_opener::test_support::{DriverCall, RecordingDriver};
use omni_tool_opener::{
    DurationPolicy, LifecycleManager, LifecycleManagerConfig, Phase, PlatformDriver, StartError,
};

const TASKS_URL: &str = "https://tasks.google.com/tasks/";
const GMAIL_URL: &str = "https://mail.google.com/";

fn start_manager(
    driver: &Arc<RecordingDriver>,
    config: LifecycleManagerConfig,
) -> Arc<LifecycleManager> {
    let driver: Arc<dyn PlatformDriver> = driver.clone();
    LifecycleManager::start(driver, config)
}

#[tokio::test(start_paused = true)]
async fn tasks_job_goes_pending_active_closed_after_duration() {
    let driver = Arc::new(RecordingDriver::working());
    let manager = start_manager(&driver, LifecycleManagerConfig::default());

    let handle = manager
        .start_tool("tasks", TASKS_URL, Duration::from_secs(2))
        .await
        .expect("start should succeed");

    // Acknowledged before the job had a chance to run.
    let accepted = handle.snapshot().await;
    assert_eq!(accepted.phase, Phase::Pending);
    assert_eq!(accepted.location, TASKS_URL);
    assert_eq!(accepted.duration, 2);
    assert_eq!(driver.activate_count(), 0);

    let done = handle
        .wait_terminal(Duration::from_secs(30))
        .await
        .expect("job should finish");
    assert_eq!(done.phase, Phase::Closed);
    assert!(done.error.is_none());

    let activated_at = done.activated_at.expect("job went through Active");
    let finished_at = done.finished_at.expect("job finished");
    assert!(activated_at.duration_since(done.created_at) < Duration::from_secs(1));
    assert!(finished_at.duration_since(activated_at) >= Duration::from_secs(2));

    assert_eq!(
        driver.calls(),
        vec![
            DriverCall::Activate(TASKS_URL.to_string()),
            DriverCall::Deactivate
        ]
    );
    assert!(driver.open_views().is_empty());
}

#[tokio::test(start_paused = true)]
async fn job_is_active_while_waiting_out_duration() {
    let driver = Arc::new(RecordingDriver::working());
    let manager = start_manager(&driver, LifecycleManagerConfig::default());

    let handle = manager
        .start_job(GMAIL_URL, Duration::from_secs(10))
        .await
        .expect("start should succeed");
    tokio::time::sleep(Duration::from_secs(5)).await;

    let midway = manager
        .get_status(handle.job_id())
        .await
        .expect("job is tracked");
    assert_eq!(midway.phase, Phase::Active);
    assert_eq!(driver.activate_count(), 1);
    assert_eq!(driver.deactivate_count(), 0);
    assert_eq!(driver.open_views(), vec![GMAIL_URL.to_string()]);
}

#[tokio::test(start_paused = true)]
async fn unsupported_host_fails_without_activating() {
    let driver = Arc::new(RecordingDriver::unsupported(
        "This feature is only supported on macOS.",
    ));
    let manager = start_manager(&driver, LifecycleManagerConfig::default());

    let mut handles = Vec::new();
    for tool in ["gmail", "calendar", "tasks"] {
        handles.push(
            manager
                .start_tool(tool, GMAIL_URL, Duration::from_secs(5))
                .await
                .expect("start should succeed"),
        );
    }

    for handle in handles {
        let done = handle
            .wait_terminal(Duration::from_secs(30))
            .await
            .expect("job should finish");
        assert_eq!(done.phase, Phase::Failed);
        assert_eq!(
            done.error.as_deref(),
            Some("This feature is only supported on macOS.")
        );
        assert!(done.activated_at.is_none());
    }
    assert_eq!(driver.activate_count(), 0);
    assert_eq!(driver.deactivate_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn activate_failure_fails_job_and_never_deactivates() {
    let driver = Arc::new(RecordingDriver::failing_activate(
        "Not authorized to send Apple events to Google Chrome.",
    ));
    let manager = start_manager(&driver, LifecycleManagerConfig::default());

    let handle = manager
        .start_tool("gmail", GMAIL_URL, Duration::from_secs(10))
        .await
        .expect("start should succeed");
    let done = handle
        .wait_terminal(Duration::from_secs(30))
        .await
        .expect("job should finish");

    assert_eq!(done.phase, Phase::Failed);
    let error = done.error.expect("failed job carries an error");
    assert!(error.contains("Not authorized"), "unexpected error: {error}");
    assert_eq!(driver.activate_count(), 1);
    assert_eq!(driver.deactivate_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn deactivate_failure_fails_job_and_leaves_view_open() {
    let driver = Arc::new(RecordingDriver::failing_deactivate("Google Chrome got an error"));
    let manager = start_manager(&driver, LifecycleManagerConfig::default());

    let handle = manager
        .start_job(TASKS_URL, Duration::from_secs(1))
        .await
        .expect("start should succeed");
    let done = handle
        .wait_terminal(Duration::from_secs(30))
        .await
        .expect("job should finish");

    assert_eq!(done.phase, Phase::Failed);
    assert!(done.activated_at.is_some());
    assert!(
        done.error
            .as_deref()
            .is_some_and(|error| error.contains("Google Chrome got an error"))
    );
    assert_eq!(driver.deactivate_count(), 1);
    assert_eq!(driver.open_views(), vec![TASKS_URL.to_string()]);
}

#[tokio::test]
async fn deactivate_with_nothing_open_succeeds() {
    let driver = RecordingDriver::working();
    driver
        .deactivate()
        .await
        .expect("closing nothing is not an error");
    driver
        .deactivate()
        .await
        .expect("closing nothing twice is not an error");
    assert_eq!(driver.deactivate_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn duration_over_maximum_is_clamped_by_default() {
    let driver = Arc::new(RecordingDriver::working());
    let manager = start_manager(
        &driver,
        LifecycleManagerConfig {
            max_duration_secs: 5,
            ..LifecycleManagerConfig::default()
        },
    );

    let handle = manager
        .start_job(TASKS_URL, Duration::from_secs(600))
        .await
        .expect("clamped start should succeed");
    assert_eq!(handle.duration(), Duration::from_secs(5));

    let done = handle
        .wait_terminal(Duration::from_secs(30))
        .await
        .expect("job should finish");
    assert_eq!(done.phase, Phase::Closed);
}

#[tokio::test(start_paused = true)]
async fn duration_over_maximum_is_rejected_under_reject_policy() {
    let driver = Arc::new(RecordingDriver::working());
    let manager = start_manager(
        &driver,
        LifecycleManagerConfig {
            max_duration_secs: 5,
            duration_policy: DurationPolicy::Reject,
            ..LifecycleManagerConfig::default()
        },
    );

    let error = manager
        .start_job(TASKS_URL, Duration::from_secs(6))
        .await
        .expect_err("duration above maximum must be rejected");
    assert_eq!(
        error,
        StartError::DurationExceeded {
            requested_secs: 6,
            max_secs: 5
        }
    );
    assert_eq!(manager.metrics().await.total_jobs, 0);
    assert_eq!(driver.activate_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn full_queue_rejects_without_creating_a_record() {
    let driver = Arc::new(RecordingDriver::working());
    let manager = start_manager(
        &driver,
        LifecycleManagerConfig {
            queue_capacity: 1,
            max_in_flight: 1,
            ..LifecycleManagerConfig::default()
        },
    );

    // One job running, one held by the dispatcher waiting for a worker, one queued.
    for _ in 0..3 {
        manager
            .start_job(TASKS_URL, Duration::from_secs(60))
            .await
            .expect("job fits");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    let error = manager
        .start_job(GMAIL_URL, Duration::from_secs(60))
        .await
        .expect_err("fourth job must be rejected");
    assert_eq!(error, StartError::AtCapacity { limit: 1 });

    let metrics = manager.metrics().await;
    assert_eq!(metrics.total_jobs, 3);
    assert_eq!(metrics.active, 1);
    assert_eq!(metrics.pending, 2);
    assert_eq!(driver.activate_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn worker_pool_serializes_jobs_beyond_max_in_flight() {
    let driver = Arc::new(RecordingDriver::working());
    let manager = start_manager(
        &driver,
        LifecycleManagerConfig {
            max_in_flight: 1,
            ..LifecycleManagerConfig::default()
        },
    );

    let first = manager
        .start_tool("tasks", TASKS_URL, Duration::from_secs(5))
        .await
        .expect("first job accepted");
    let second = manager
        .start_tool("gmail", GMAIL_URL, Duration::from_secs(5))
        .await
        .expect("second job accepted");

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(first.snapshot().await.phase, Phase::Active);
    assert_eq!(second.snapshot().await.phase, Phase::Pending);

    let metrics = manager.metrics().await;
    assert_eq!(metrics.active, 1);
    assert_eq!(metrics.pending, 1);

    let first_done = first
        .wait_terminal(Duration::from_secs(30))
        .await
        .expect("first job should finish");
    let second_done = second
        .wait_terminal(Duration::from_secs(30))
        .await
        .expect("second job should finish");
    assert_eq!(first_done.phase, Phase::Closed);
    assert_eq!(second_done.phase, Phase::Closed);
    let first_finished = first_done.finished_at.expect("finished");
    let second_activated = second_done.activated_at.expect("activated");
    assert!(second_activated >= first_finished);
}

#[tokio::test(start_paused = true)]
async fn finished_records_beyond_retention_are_evicted() {
    let driver = Arc::new(RecordingDriver::working());
    let manager = start_manager(
        &driver,
        LifecycleManagerConfig {
            retain_finished: 1,
            ..LifecycleManagerConfig::default()
        },
    );

    let mut finished_ids = Vec::new();
    for _ in 0..2 {
        let handle = manager
            .start_job(TASKS_URL, Duration::from_secs(1))
            .await
            .expect("start should succeed");
        handle
            .wait_terminal(Duration::from_secs(30))
            .await
            .expect("job should finish");
        finished_ids.push(handle.job_id().to_string());
    }

    let live = manager
        .start_job(TASKS_URL, Duration::from_secs(60))
        .await
        .expect("start should succeed");

    assert!(manager.get_status(&finished_ids[0]).await.is_none());
    assert!(manager.get_status(&finished_ids[1]).await.is_some());
    assert!(manager.get_status(live.job_id()).await.is_some());
    assert_eq!(manager.metrics().await.total_jobs, 2);
}

#[tokio::test(start_paused = true)]
async fn status_queries_cover_known_and_unknown_jobs() {
    let driver = Arc::new(RecordingDriver::working());
    let manager = start_manager(&driver, LifecycleManagerConfig::default());

    let first = manager
        .start_tool("tasks", TASKS_URL, Duration::from_secs(3))
        .await
        .expect("start should succeed");
    let second = manager
        .start_tool("gmail", GMAIL_URL, Duration::from_secs(3))
        .await
        .expect("start should succeed");
    assert_ne!(first.job_id(), second.job_id());

    assert!(manager.get_status("job-0-999").await.is_none());
    assert!(manager.handle(first.job_id()).await.is_some());

    let listed = manager.list().await;
    let ids: Vec<&str> = listed.iter().map(|s| s.job_id.as_str()).collect();
    assert_eq!(ids, vec![first.job_id(), second.job_id()]);
    assert_eq!(listed[0].tool.as_deref(), Some("tasks"));
    assert_eq!(listed[1].tool.as_deref(), Some("gmail"));
}

#[tokio::test(start_paused = true)]
async fn panicking_driver_fails_job_and_keeps_dispatching() {
    let driver = Arc::new(RecordingDriver::panicking_activate("automation bridge exploded"));
    let manager = start_manager(
        &driver,
        LifecycleManagerConfig {
            max_in_flight: 1,
            retain_finished: 1,
            ..LifecycleManagerConfig::default()
        },
    );

    let first = manager
        .start_job(TASKS_URL, Duration::from_secs(5))
        .await
        .expect("start should succeed");
    let done = first
        .wait_terminal(Duration::from_secs(3600))
        .await
        .expect("crashed job still reaches a terminal phase");
    assert_eq!(done.phase, Phase::Failed);
    assert!(
        done.error
            .as_deref()
            .is_some_and(|error| error.contains("job worker crashed")),
        "unexpected error: {:?}",
        done.error
    );

    // The worker slot is released and later jobs still run.
    let second = manager
        .start_job(GMAIL_URL, Duration::from_secs(5))
        .await
        .expect("start should succeed");
    let second_done = second
        .wait_terminal(Duration::from_secs(3600))
        .await
        .expect("second job should finish");
    assert_eq!(second_done.phase, Phase::Failed);
    assert_eq!(driver.activate_count(), 2);

    // Crashed records are terminal, so retention can evict them.
    let _third = manager
        .start_job(GMAIL_URL, Duration::from_secs(5))
        .await
        .expect("start should succeed");
    assert!(manager.get_status(first.job_id()).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn list_keeps_acceptance_order_past_ten_jobs() {
    let driver = Arc::new(RecordingDriver::working());
    let manager = start_manager(&driver, LifecycleManagerConfig::default());

    let mut accepted = Vec::new();
    for _ in 0..12 {
        let handle = manager
            .start_job(TASKS_URL, Duration::from_secs(60))
            .await
            .expect("start should succeed");
        accepted.push(handle.job_id().to_string());
    }

    let listed: Vec<String> = manager
        .list()
        .await
        .into_iter()
        .map(|snapshot| snapshot.job_id)
        .collect();
    assert_eq!(listed, accepted);
}

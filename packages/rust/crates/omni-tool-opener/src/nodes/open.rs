use std::time::Duration;

use anyhow::{Context, bail};

use omni_tool_opener::{LifecycleManager, Phase, RuntimeSettings};

use super::build_driver;

/// Slack for scheduling on top of the open and close script runs.
const WAIT_SLACK_SECS: u64 = 5;

pub(crate) async fn run_open_mode(
    tool: &str,
    duration: Option<u64>,
    runtime_settings: &RuntimeSettings,
) -> anyhow::Result<()> {
    let catalog = runtime_settings.catalog();
    let location = catalog.lookup(tool)?;

    let config = runtime_settings.lifecycle_config();
    let duration = duration.map_or_else(|| config.default_duration(), Duration::from_secs);
    let script_timeout = runtime_settings.driver_config().script_timeout;
    let manager = LifecycleManager::start(build_driver(runtime_settings), config);
    let handle = manager.start_tool(tool, location, duration).await?;

    tracing::info!(
        job_id = %handle.job_id(),
        %tool,
        duration_secs = handle.duration().as_secs(),
        "opening tool"
    );
    let snapshot = handle
        .wait_terminal(wait_budget(handle.duration(), script_timeout))
        .await
        .with_context(|| format!("job {} did not finish in time", handle.job_id()))?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    if snapshot.phase == Phase::Failed {
        bail!(
            "job {} failed: {}",
            snapshot.job_id,
            snapshot.error.unwrap_or_default()
        );
    }
    Ok(())
}

/// Job duration plus one timed-out open script and one timed-out close script.
fn wait_budget(duration: Duration, script_timeout: Duration) -> Duration {
    duration + script_timeout * 2 + Duration::from_secs(WAIT_SLACK_SECS)
}

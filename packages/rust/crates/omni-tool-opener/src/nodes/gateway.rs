use omni_tool_opener::{GatewayState, LifecycleManager, RuntimeSettings, run_http};

use super::build_driver;

pub(crate) async fn run_gateway_mode(
    bind_addr: Option<String>,
    max_in_flight: Option<usize>,
    max_duration: Option<u64>,
    runtime_settings: &RuntimeSettings,
) -> anyhow::Result<()> {
    let mut config = runtime_settings.lifecycle_config();
    if let Some(max_in_flight) = max_in_flight {
        config.max_in_flight = max_in_flight;
    }
    if let Some(max_duration) = max_duration {
        config.max_duration_secs = max_duration;
    }
    let bind_addr = bind_addr.unwrap_or_else(|| runtime_settings.bind_addr());

    let driver = build_driver(runtime_settings);
    let manager = LifecycleManager::start(driver.clone(), config);
    let state = GatewayState::new(manager, runtime_settings.catalog(), driver);
    run_http(state, &bind_addr).await
}

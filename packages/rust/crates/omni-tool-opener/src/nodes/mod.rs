mod gateway;
mod open;
mod tools;

use std::sync::Arc;

use omni_tool_opener::{AppleScriptDriver, PlatformDriver, RuntimeSettings};

pub(crate) use gateway::run_gateway_mode;
pub(crate) use open::run_open_mode;
pub(crate) use tools::run_tools_mode;

fn build_driver(runtime_settings: &RuntimeSettings) -> Arc<dyn PlatformDriver> {
    let driver = AppleScriptDriver::new(runtime_settings.driver_config());
    if !driver.is_supported() {
        tracing::warn!(
            reason = %driver.unsupported_reason(),
            "platform driver unsupported on this host; every job will fail"
        );
    }
    Arc::new(driver)
}

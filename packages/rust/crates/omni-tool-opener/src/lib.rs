//! Timed tool opener: open a workspace tool in the browser, close it after N seconds.
//!
//! - **Catalog**: fixed tool name → URL table (`gmail`, `calendar`, `notion`, `tasks`, plus settings).
//! - **Driver**: host automation behind `PlatformDriver`; `AppleScriptDriver` on macOS.
//! - **Jobs**: `LifecycleManager` runs open → wait → close on a bounded worker pool and
//!   records each outcome on a `JobRecord`; callers read it through a `JobHandle`.
//! - **Gateway**: axum HTTP boundary (`POST /api/open-tool`, `GET /api/jobs/{id}`).

#![allow(missing_docs)]

mod catalog;
mod config;
mod driver;
mod error;
mod gateway;
mod jobs;
#[doc(hidden)]
pub mod test_support;

pub use catalog::{BUILTIN_TOOLS, CatalogEntry, ResourceCatalog};
pub use config::{
    DEFAULT_BIND_ADDR, DriverSettings, GatewaySettings, JobSettings, RuntimeSettings,
    load_runtime_settings, load_runtime_settings_from_paths, runtime_settings_paths,
    set_config_home_override,
};
pub use driver::{
    AppleScriptDriver, AppleScriptDriverConfig, DEFAULT_APPLICATION, DEFAULT_UNSUPPORTED_REASON,
    PlatformDriver, UNSUPPORTED_PLATFORM_REASON, render_close_script, render_open_script,
    validate_location,
};
pub use error::{CatalogError, DriverError, StartError, TransitionError};
pub use gateway::{
    ErrorResponse, GatewayHealthResponse, GatewayState, OPEN_TOOL_STATUS, OpenToolRequest,
    OpenToolResponse, ResolvedOpenTool, router, run_http, validate_open_tool_request,
};
pub use jobs::{
    DurationPolicy, JobHandle, JobMetricsSnapshot, JobRecord, JobSnapshot, LifecycleManager,
    LifecycleManagerConfig, Phase,
};

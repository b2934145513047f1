//! Platform driver: the side-effect boundary that opens and closes a view of a location.
//!
//! Drivers hold no per-job state. `deactivate` targets "the most recently
//! activated view", so two concurrent jobs against the same application can
//! close each other's views. Callers that need per-job isolation must not run
//! jobs concurrently against one application instance.

mod applescript;

use async_trait::async_trait;

use crate::error::DriverError;

pub use applescript::{
    AppleScriptDriver, AppleScriptDriverConfig, DEFAULT_APPLICATION, UNSUPPORTED_PLATFORM_REASON,
    render_close_script, render_open_script, validate_location,
};

/// Reason recorded when a driver reports itself unsupported without a specific message.
pub const DEFAULT_UNSUPPORTED_REASON: &str = "environment unsupported";

/// Host automation capability used by the lifecycle manager.
#[async_trait]
pub trait PlatformDriver: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether this host can perform the side effect at all.
    fn is_supported(&self) -> bool;

    /// Environment-specific explanation used when `is_supported` is false.
    fn unsupported_reason(&self) -> String {
        DEFAULT_UNSUPPORTED_REASON.to_string()
    }

    /// Bring a new view of `location` to the foreground, creating a window if none exists.
    async fn activate(&self, location: &str) -> Result<(), DriverError>;

    /// Close the most recently activated view. Succeeds when there is nothing to close.
    async fn deactivate(&self) -> Result<(), DriverError>;
}

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::driver::PlatformDriver;
use crate::error::DriverError;

/// One observed driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Activate(String),
    Deactivate,
}

/// Driver double that records calls and can be told to fail.
///
/// Models a single application window: `activate` pushes a view,
/// `deactivate` pops the most recent one and succeeds when there is none.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    unsupported_reason: Option<String>,
    activate_error: Option<String>,
    activate_panic: Option<String>,
    deactivate_error: Option<String>,
    activate_delay: Duration,
    activate_calls: AtomicUsize,
    deactivate_calls: AtomicUsize,
    state: Mutex<RecordingState>,
}

#[derive(Debug, Default)]
struct RecordingState {
    calls: Vec<DriverCall>,
    open_views: Vec<String>,
}

impl RecordingDriver {
    /// Supported host, every call succeeds.
    #[must_use]
    pub fn working() -> Self {
        Self::default()
    }

    /// Host reports itself unsupported with `reason`.
    #[must_use]
    pub fn unsupported(reason: &str) -> Self {
        Self {
            unsupported_reason: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// `activate` fails with `message`.
    #[must_use]
    pub fn failing_activate(message: &str) -> Self {
        Self {
            activate_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// `activate` panics with `message`.
    #[must_use]
    pub fn panicking_activate(message: &str) -> Self {
        Self {
            activate_panic: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// `activate` succeeds, `deactivate` fails with `message`.
    #[must_use]
    pub fn failing_deactivate(message: &str) -> Self {
        Self {
            deactivate_error: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Make `activate` take `delay` before it returns.
    #[must_use]
    pub fn with_activate_delay(mut self, delay: Duration) -> Self {
        self.activate_delay = delay;
        self
    }

    #[must_use]
    pub fn activate_count(&self) -> usize {
        self.activate_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn deactivate_count(&self) -> usize {
        self.deactivate_calls.load(Ordering::SeqCst)
    }

    /// Calls in the order they happened.
    #[must_use]
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock_state().calls.clone()
    }

    /// Views opened and not yet closed.
    #[must_use]
    pub fn open_views(&self) -> Vec<String> {
        self.lock_state().open_views.clone()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RecordingState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl PlatformDriver for RecordingDriver {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_supported(&self) -> bool {
        self.unsupported_reason.is_none()
    }

    fn unsupported_reason(&self) -> String {
        self.unsupported_reason
            .clone()
            .unwrap_or_else(|| crate::driver::DEFAULT_UNSUPPORTED_REASON.to_string())
    }

    async fn activate(&self, location: &str) -> Result<(), DriverError> {
        self.activate_calls.fetch_add(1, Ordering::SeqCst);
        self.lock_state()
            .calls
            .push(DriverCall::Activate(location.to_string()));
        if !self.activate_delay.is_zero() {
            tokio::time::sleep(self.activate_delay).await;
        }
        if let Some(message) = &self.activate_panic {
            panic!("{message}");
        }
        if let Some(message) = &self.activate_error {
            return Err(DriverError::ScriptFailed {
                exit_code: Some(1),
                stderr: message.clone(),
            });
        }
        self.lock_state().open_views.push(location.to_string());
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), DriverError> {
        self.deactivate_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock_state();
        state.calls.push(DriverCall::Deactivate);
        if let Some(message) = &self.deactivate_error {
            return Err(DriverError::ScriptFailed {
                exit_code: Some(1),
                stderr: message.clone(),
            });
        }
        // Nothing open is not an error.
        state.open_views.pop();
        Ok(())
    }
}

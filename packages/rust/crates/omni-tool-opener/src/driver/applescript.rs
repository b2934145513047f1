//! `osascript` driver for Chromium-family browsers on macOS.
//!
//! Opens a new tab at the end of the front window and later closes the last
//! tab of that window. Runs the script through `tokio::process` with a hard
//! timeout so a hung automation prompt cannot pin a job forever.
//!
//! The close script targets the last tab of window 1, not a tab identity.
//! With overlapping jobs, or a user opening tabs meanwhile, it can close a
//! tab some other job (or the user) opened.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::PlatformDriver;
use crate::error::DriverError;

/// Browser targeted when no application is configured.
pub const DEFAULT_APPLICATION: &str = "Google Chrome";

/// Reason recorded for jobs started on anything but macOS.
pub const UNSUPPORTED_PLATFORM_REASON: &str = "This feature is only supported on macOS.";

const DEFAULT_PROGRAM: &str = "osascript";
/// `open -Ra <app>` exits non-zero when Launch Services cannot find the application.
const APPLICATION_PROBE_PROGRAM: &str = "open";
const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 15;
const STDERR_PREVIEW_CHARS: usize = 400;

/// Driver settings.
#[derive(Debug, Clone)]
pub struct AppleScriptDriverConfig {
    /// Application name as known to AppleScript.
    pub application: String,
    /// Interpreter binary, resolved on `PATH`.
    pub program: String,
    /// Upper bound for one script run.
    pub script_timeout: Duration,
}

impl Default for AppleScriptDriverConfig {
    fn default() -> Self {
        Self {
            application: DEFAULT_APPLICATION.to_string(),
            program: DEFAULT_PROGRAM.to_string(),
            script_timeout: Duration::from_secs(DEFAULT_SCRIPT_TIMEOUT_SECS),
        }
    }
}

/// Browser tab driver backed by `osascript`.
#[derive(Debug, Clone)]
pub struct AppleScriptDriver {
    config: AppleScriptDriverConfig,
    unsupported: Option<String>,
}

impl AppleScriptDriver {
    /// Create a driver; host support is probed once here.
    ///
    /// Support needs macOS, the interpreter on `PATH`, and the target
    /// application known to Launch Services. The probe blocks briefly.
    #[must_use]
    pub fn new(config: AppleScriptDriverConfig) -> Self {
        let unsupported = probe_support(&config);
        tracing::debug!(
            application = %config.application,
            program = %config.program,
            supported = unsupported.is_none(),
            "applescript driver initialized"
        );
        Self {
            config,
            unsupported,
        }
    }

    async fn run_script(&self, script: &str) -> Result<(), DriverError> {
        tracing::debug!(program = %self.config.program, "running automation script");
        let mut command = Command::new(&self.config.program);
        command.arg("-e").arg(script).kill_on_drop(true);

        let output = match tokio::time::timeout(self.config.script_timeout, command.output()).await
        {
            Ok(Ok(output)) => output,
            Ok(Err(error)) => {
                return Err(DriverError::Spawn {
                    program: self.config.program.clone(),
                    message: error.to_string(),
                });
            }
            Err(_) => return Err(DriverError::Timeout(self.config.script_timeout)),
        };

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(DriverError::ScriptFailed {
            exit_code: output.status.code(),
            stderr: stderr.trim().chars().take(STDERR_PREVIEW_CHARS).collect(),
        })
    }
}

impl Default for AppleScriptDriver {
    fn default() -> Self {
        Self::new(AppleScriptDriverConfig::default())
    }
}

#[async_trait]
impl PlatformDriver for AppleScriptDriver {
    fn name(&self) -> &str {
        "applescript"
    }

    fn is_supported(&self) -> bool {
        self.unsupported.is_none()
    }

    fn unsupported_reason(&self) -> String {
        self.unsupported
            .clone()
            .unwrap_or_else(|| super::DEFAULT_UNSUPPORTED_REASON.to_string())
    }

    async fn activate(&self, location: &str) -> Result<(), DriverError> {
        validate_location(location)?;
        let script = render_open_script(&self.config.application, location);
        self.run_script(&script).await
    }

    async fn deactivate(&self) -> Result<(), DriverError> {
        let script = render_close_script(&self.config.application);
        self.run_script(&script).await
    }
}

fn probe_support(config: &AppleScriptDriverConfig) -> Option<String> {
    if !cfg!(target_os = "macos") {
        return Some(UNSUPPORTED_PLATFORM_REASON.to_string());
    }
    if which::which(&config.program).is_err() {
        return Some(format!("{} is not available on PATH", config.program));
    }
    if !application_installed(APPLICATION_PROBE_PROGRAM, &config.application) {
        return Some(format!("application {} is not installed", config.application));
    }
    None
}

fn application_installed(probe: &str, application: &str) -> bool {
    std::process::Command::new(probe)
        .arg("-Ra")
        .arg(application)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

/// Accept only `http(s)` locations that are safe to embed in a script literal.
pub fn validate_location(location: &str) -> Result<(), DriverError> {
    let invalid = |reason: &str| DriverError::InvalidLocation {
        location: location.to_string(),
        reason: reason.to_string(),
    };

    let rest = location
        .strip_prefix("https://")
        .or_else(|| location.strip_prefix("http://"))
        .ok_or_else(|| invalid("scheme must be http or https"))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(invalid("missing host"));
    }
    if location
        .chars()
        .any(|c| c.is_control() || c.is_whitespace() || c == '"' || c == '\\')
    {
        return Err(invalid("contains whitespace, quotes, or control characters"));
    }
    Ok(())
}

/// Script that appends a tab for `location` and focuses it.
#[must_use]
pub fn render_open_script(application: &str, location: &str) -> String {
    let application = escape_literal(application);
    let location = escape_literal(location);
    format!(
        r#"tell application "{application}"
    if not (exists window 1) then
        make new window
    end if
    tell window 1
        make new tab at end of tabs with properties {{URL:"{location}"}}
        set active tab index to (count of tabs)
    end tell
    activate
end tell"#
    )
}

/// Script that closes the last tab of the front window, if there is one.
#[must_use]
pub fn render_close_script(application: &str) -> String {
    let application = escape_literal(application);
    format!(
        r#"tell application "{application}"
    if (count of windows) > 0 then
        tell window 1
            if (count of tabs) > 0 then
                close tab (count of tabs)
            end if
        end tell
    end if
end tell"#
    )
}

fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_script_embeds_location_and_focuses_new_tab() {
        let script = render_open_script("Google Chrome", "https://tasks.google.com/tasks/");
        assert!(script.starts_with(r#"tell application "Google Chrome""#));
        assert!(script.contains(r#"{URL:"https://tasks.google.com/tasks/"}"#));
        assert!(script.contains("make new window"));
        assert!(script.contains("set active tab index to (count of tabs)"));
    }

    #[test]
    fn close_script_guards_empty_windows_and_tabs() {
        let script = render_close_script("Chromium");
        assert!(script.contains("if (count of windows) > 0 then"));
        assert!(script.contains("if (count of tabs) > 0 then"));
        assert!(script.contains("close tab (count of tabs)"));
    }

    #[test]
    fn application_name_is_escaped() {
        let script = render_close_script(r#"Evil" to quit"#);
        assert!(script.contains(r#"tell application "Evil\" to quit""#));
    }

    #[test]
    fn validate_location_accepts_http_and_https() {
        assert!(validate_location("https://mail.google.com/").is_ok());
        assert!(validate_location("http://localhost:3000/board?x=1").is_ok());
    }

    #[test]
    fn validate_location_rejects_malformed_values() {
        for bad in [
            "",
            "mail.google.com",
            "file:///etc/passwd",
            "https://",
            "https:///path",
            "https://a.com/\"} & do shell script \"x",
            "https://a.com/ b",
            "https://a.com/\n",
        ] {
            assert!(
                matches!(
                    validate_location(bad),
                    Err(DriverError::InvalidLocation { .. })
                ),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn driver_is_unsupported_off_macos() {
        let driver = AppleScriptDriver::default();
        assert!(!driver.is_supported());
        assert_eq!(driver.unsupported_reason(), UNSUPPORTED_PLATFORM_REASON);
    }

    #[cfg(unix)]
    #[test]
    fn application_probe_follows_probe_exit_status() {
        assert!(application_installed("true", "Google Chrome"));
        assert!(!application_installed("false", "Google Chrome"));
        assert!(!application_installed(
            "omni-tool-opener-no-such-binary",
            "Google Chrome"
        ));
    }

    #[tokio::test]
    async fn missing_interpreter_surfaces_spawn_error() {
        let driver = AppleScriptDriver::new(AppleScriptDriverConfig {
            program: "omni-tool-opener-no-such-binary".to_string(),
            ..AppleScriptDriverConfig::default()
        });
        assert!(!driver.is_supported());
        let error = driver
            .deactivate()
            .await
            .expect_err("missing interpreter must fail");
        assert!(matches!(error, DriverError::Spawn { .. }));
    }
}

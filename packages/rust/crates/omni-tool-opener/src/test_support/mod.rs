//! Test-only exports for integration tests.
//!
//! Provides a driver double so lifecycle and gateway tests can run on any
//! host without touching a real application.

mod recording_driver;

pub use recording_driver::{DriverCall, RecordingDriver};

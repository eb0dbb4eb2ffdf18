//! LuxAlarm core
//!
//! Scheduling engine and dismissal gatekeeper for an ambient-light-
//! gated alarm clock: an armed alarm cannot be silenced by touch
//! alone — the device's light sensor must see illumination above a
//! configurable threshold (optionally combined with a PIN challenge)
//! before dismissal is permitted.
//!
//! This crate is the on-device core only. UI screens, notification
//! channels and ringtone playback live in the embedding app, wired in
//! through the collaborator traits in [`platform`].

pub mod config;
pub mod database;
pub mod error;
pub mod platform;
pub mod services;

pub use database::{Alarm, RepeatDay, Repository};
pub use error::{AppError, Result};
pub use services::{AlarmScheduler, AlarmsService, DismissalGate, RingingService};

/// Install a fmt subscriber for test runs so tracing output from the
/// code under test shows up under `--nocapture`. Safe to call from
/// every test; only the first call wins.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("luxalarm=debug,info")),
        )
        .with_test_writer()
        .try_init();
}

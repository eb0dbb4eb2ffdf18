//! Application configuration constants
//!
//! Central location for all configuration constants, resource limits,
//! and validation boundaries used throughout the core.

// ===== Time-of-Day Limits =====

/// Maximum valid alarm hour (24-hour clock)
pub const MAX_HOUR: u32 = 23;

/// Maximum valid alarm minute
pub const MAX_MINUTE: u32 = 59;

// ===== Lux Dismissal Limits =====

/// Maximum configurable lux dismissal threshold.
/// Typical indoor lighting tops out well below this; 1000 lux is
/// bright daylight through a window.
pub const MAX_DISMISS_LUX: u32 = 1000;

/// Default lux dismissal threshold for new alarms (normal room lighting)
pub const DEFAULT_DISMISS_LUX: u32 = 50;

// ===== Volume Limits =====

/// Maximum alarm volume as a percentage of the platform alarm stream
pub const MAX_VOLUME: u32 = 100;

/// Default alarm volume for new alarms
pub const DEFAULT_VOLUME: u32 = 80;

// ===== Snooze Settings =====

/// Snooze durations offered by the ringing screen, in minutes
pub const SNOOZE_PRESETS_MINUTES: &[u32] = &[5, 10, 15, 20];

/// Upper bound on a snooze duration in minutes.
/// Anything longer should be a scheduled alarm, not a snooze.
pub const MAX_SNOOZE_MINUTES: u32 = 60;

// ===== Skip Settings =====

/// Offset added past a skipped occurrence when searching for the
/// following one. One minute guarantees progress past the skipped
/// instant without ever landing inside the same occurrence.
pub const SKIP_SEARCH_OFFSET_MINUTES: i64 = 1;

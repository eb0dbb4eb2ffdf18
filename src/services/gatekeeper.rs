//! Dismissal gatekeeper
//!
//! Per-session state machine deciding whether a ringing alarm may be
//! silenced. Two independent predicates gate dismissal: the light
//! condition (last known illuminance strictly above the alarm's
//! threshold) and the PIN condition (a matching PIN has been
//! submitted). The gate is evaluated on demand — the UI keeps its
//! dismiss control enabled/disabled from `can_dismiss`, but the state
//! only moves to `Dismissed` on an explicit dismiss action while both
//! predicates hold.
//!
//! Pure and synchronous; sensor readings and PIN attempts are pushed
//! in by the ringing session.

use crate::database::Alarm;

/// Gate lifecycle for one ringing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Initial state, entered whenever a ringing session starts.
    Locked,
    /// Terminal for this session; the ringer has been silenced.
    Dismissed,
}

/// Result of a PIN submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    Accepted,
    /// Wrong PIN: surfaced to the user, gate state unchanged, retry
    /// permitted indefinitely.
    Rejected,
}

/// Dismissal gate for a single ringing session.
#[derive(Debug, Clone)]
pub struct DismissalGate {
    state: GateState,
    /// Light gating only applies when the alarm asks for it AND the
    /// device actually has a light sensor. Without a sensor the light
    /// condition is forced satisfied — a deliberate fallback so the
    /// alarm can always be silenced somehow.
    lux_gating: bool,
    dismiss_lux: u32,
    pin_required: bool,
    pin: Option<String>,
    last_lux: Option<f32>,
    pin_satisfied: bool,
}

impl DismissalGate {
    pub fn new(alarm: &Alarm, sensor_present: bool) -> Self {
        if alarm.is_lux_dismissal_enabled && !sensor_present {
            tracing::warn!(
                "Alarm {} wants lux dismissal but no light sensor is present; light gate disabled",
                alarm.id
            );
        }

        Self {
            state: GateState::Locked,
            lux_gating: alarm.is_lux_dismissal_enabled && sensor_present,
            dismiss_lux: alarm.dismiss_lux,
            pin_required: alarm.is_pin_enabled,
            pin: alarm.pin.clone(),
            last_lux: None,
            pin_satisfied: false,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_dismissed(&self) -> bool {
        self.state == GateState::Dismissed
    }

    /// Latest illuminance reading, for the ringing screen's display.
    pub fn last_lux(&self) -> Option<f32> {
        self.last_lux
    }

    /// Record a sensor reading. Arrival rate is arbitrary; only the
    /// most recent value matters.
    pub fn on_lux_reading(&mut self, lux: f32) {
        self.last_lux = Some(lux);
    }

    /// Evaluate a PIN attempt. A match satisfies the PIN condition for
    /// the rest of the session; a mismatch changes nothing.
    pub fn submit_pin(&mut self, attempt: &str) -> PinOutcome {
        if !self.pin_required {
            return PinOutcome::Accepted;
        }

        if self.pin.as_deref() == Some(attempt) {
            self.pin_satisfied = true;
            PinOutcome::Accepted
        } else {
            tracing::debug!("Wrong PIN submitted");
            PinOutcome::Rejected
        }
    }

    /// Light condition: strictly above the threshold, or gating inactive.
    pub fn light_ok(&self) -> bool {
        if !self.lux_gating {
            return true;
        }
        self.last_lux
            .is_some_and(|lux| lux > self.dismiss_lux as f32)
    }

    /// PIN condition: no PIN required, or a matching PIN was submitted.
    pub fn pin_ok(&self) -> bool {
        !self.pin_required || self.pin_satisfied
    }

    /// Whether a dismiss action would succeed right now.
    pub fn can_dismiss(&self) -> bool {
        self.state == GateState::Locked && self.light_ok() && self.pin_ok()
    }

    /// Explicit user dismiss action. Moves to `Dismissed` and returns
    /// true only when both conditions hold at this moment.
    pub fn try_dismiss(&mut self) -> bool {
        if self.can_dismiss() {
            self.state = GateState::Dismissed;
            true
        } else {
            false
        }
    }
}

/// Stateless one-shot dismissal query for UI layers that do not hold a
/// session: would this alarm be dismissable given the latest lux value
/// and an optional PIN attempt?
pub fn can_dismiss(alarm: &Alarm, last_lux: Option<f32>, pin_attempt: Option<&str>) -> bool {
    let mut gate = DismissalGate::new(alarm, last_lux.is_some());
    if let Some(lux) = last_lux {
        gate.on_lux_reading(lux);
    }
    if let Some(attempt) = pin_attempt {
        gate.submit_pin(attempt);
    }
    gate.can_dismiss()
}

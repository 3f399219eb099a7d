//! Speed/enable state machine.
//!
//! The controller state is a pair of the selected [`SpeedLevel`] and an
//! `enabled` flag that is tracked independently, so the actuator can be
//! switched off without forgetting the selected speed. [`transition`] is a
//! pure function over that pair; the caller applies the returned indicator
//! and duty effects to hardware.

use core::fmt;

use crate::speed::{IndicatorMask, SpeedLevel};

/// Request raised by a button edge and consumed when the debounce timer expires.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Request {
    CycleSpeed,
    ToggleEnable,
}

impl Request {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Request::CycleSpeed => "cycle-speed",
            Request::ToggleEnable => "toggle-enable",
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Single pending request slot. Raising a request replaces whatever was there.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PendingRequest {
    slot: Option<Request>,
}

impl PendingRequest {
    #[must_use]
    pub const fn new() -> Self {
        Self { slot: None }
    }

    /// Stores `request`, returning the request it superseded, if any.
    pub fn raise(&mut self, request: Request) -> Option<Request> {
        self.slot.replace(request)
    }

    /// Removes and returns the pending request.
    pub fn take(&mut self) -> Option<Request> {
        self.slot.take()
    }

    #[must_use]
    pub const fn peek(&self) -> Option<Request> {
        self.slot
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

/// Selected speed plus the cached table values that go with it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControllerState {
    pub level: SpeedLevel,
    pub speed: u16,
    pub indicator: IndicatorMask,
    pub enabled: bool,
}

impl ControllerState {
    /// Power-up state: off level, actuator disabled.
    #[must_use]
    pub const fn initial() -> Self {
        Self::from_level(SpeedLevel::Off)
    }

    /// Adopts the table entry for `level`, including its default enable flag.
    #[must_use]
    pub const fn from_level(level: SpeedLevel) -> Self {
        let entry = level.state();
        Self {
            level,
            speed: entry.speed_value,
            indicator: entry.indicator,
            enabled: entry.enabled_by_default,
        }
    }

    /// Compare value that should be visible on the PWM output.
    #[must_use]
    pub const fn output_duty(&self) -> u16 {
        if self.enabled { self.speed } else { 0 }
    }

    /// Indicators that should be lit.
    #[must_use]
    pub const fn visible_indicator(&self) -> IndicatorMask {
        if self.enabled {
            self.indicator
        } else {
            IndicatorMask::NONE
        }
    }
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "level={} enabled={} duty={}/{}",
            self.level,
            self.enabled,
            self.output_duty(),
            crate::speed::SPEED_PERIOD
        )
    }
}

/// The process-wide mutable controller data.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ControllerContext {
    pub state: ControllerState,
    pub pending: PendingRequest,
}

impl ControllerContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: ControllerState::initial(),
            pending: PendingRequest::new(),
        }
    }
}

/// Result of applying one request: the next state and its hardware effects.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub next: ControllerState,
    /// Indicators to switch off before lighting [`Transition::light`].
    pub clear: IndicatorMask,
    pub light: IndicatorMask,
    /// Compare value to write while the PWM counter is paused.
    pub duty: u16,
}

/// Applies exactly one request to `state`.
#[must_use]
pub fn transition(state: &ControllerState, request: Request) -> Transition {
    match request {
        Request::CycleSpeed => cycle_speed(state),
        Request::ToggleEnable => toggle_enable(state),
    }
}

fn cycle_speed(state: &ControllerState) -> Transition {
    let (next, clear) = if !state.enabled && state.level != SpeedLevel::Off {
        // A speed is already selected; the first press only switches it back on.
        let mut next = *state;
        next.enabled = true;
        (next, IndicatorMask::NONE)
    } else {
        (
            ControllerState::from_level(state.level.next()),
            state.indicator,
        )
    };

    Transition {
        next,
        clear,
        light: next.indicator,
        duty: next.speed,
    }
}

fn toggle_enable(state: &ControllerState) -> Transition {
    let mut next = *state;
    next.enabled = !state.enabled;

    if next.enabled {
        Transition {
            next,
            clear: IndicatorMask::NONE,
            light: state.indicator,
            duty: state.speed,
        }
    } else {
        Transition {
            next,
            clear: state.indicator,
            light: IndicatorMask::NONE,
            duty: 0,
        }
    }
}

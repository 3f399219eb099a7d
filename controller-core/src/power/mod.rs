//! Sleep-depth policy between button events.

use core::fmt;

/// How deeply the processor sleeps once the current handler returns.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SleepMode {
    /// Core clock gated only. Reference clock stays up so the PWM and
    /// debounce counters keep running.
    Sleep,
    /// Deep sleep: everything but the edge wake-up logic is gated.
    #[default]
    Stop,
}

impl SleepMode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            SleepMode::Sleep => "sleep",
            SleepMode::Stop => "stop",
        }
    }

    /// Returns `true` when the reference clock keeps running in this mode.
    #[must_use]
    pub const fn keeps_reference_clock(self) -> bool {
        matches!(self, SleepMode::Sleep)
    }
}

impl fmt::Display for SleepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Binary policy: an enabled actuator needs its PWM clock, otherwise sleep deep.
#[must_use]
pub const fn sleep_mode_for(enabled: bool) -> SleepMode {
    if enabled {
        SleepMode::Sleep
    } else {
        SleepMode::Stop
    }
}

/// Hardware hook that arms the requested sleep depth for the next idle period.
pub trait PowerControl {
    fn apply(&mut self, mode: SleepMode);
}

pub struct PowerModeController<P> {
    control: P,
    mode: SleepMode,
}

impl<P: PowerControl> PowerModeController<P> {
    /// Arms [`SleepMode::Stop`]: nothing is generated at power-up.
    pub fn new(mut control: P) -> Self {
        let mode = SleepMode::default();
        control.apply(mode);
        Self { control, mode }
    }

    /// Keeps the reference clock alive so a freshly started debounce countdown can run.
    pub fn hold_awake(&mut self) -> SleepMode {
        self.set(SleepMode::Sleep)
    }

    /// Re-evaluates the sleep depth after a dispatch.
    pub fn select_for(&mut self, enabled: bool) -> SleepMode {
        self.set(sleep_mode_for(enabled))
    }

    pub fn mode(&self) -> SleepMode {
        self.mode
    }

    pub fn control(&self) -> &P {
        &self.control
    }

    fn set(&mut self, mode: SleepMode) -> SleepMode {
        self.control.apply(mode);
        self.mode = mode;
        mode
    }
}

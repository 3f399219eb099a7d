//! Simulated hardware for host tests and the emulator.
//!
//! Each double records what the controller asked of it so tests can assert
//! on observable behaviour (lit indicators, duty value, writes that landed
//! while the PWM counter was live, the armed sleep depth).

use core::fmt;
use core::ops::Add;
use core::time::Duration;

use crate::controller::Controller;
use crate::debounce::DeadlineTimer;
use crate::duty::PeriodicOutput;
use crate::edge::LatchedInput;
use crate::power::{PowerControl, SleepMode};
use crate::speed::{Indicator, IndicatorMask};
use crate::telemetry::TelemetryInstant;

/// Virtual monotonic time in microseconds.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SimInstant(u64);

impl SimInstant {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000)
    }

    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn duration_since(self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(micros))
    }
}

impl TelemetryInstant for SimInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        self.duration_since(earlier)
    }
}

impl fmt::Display for SimInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}ms", self.0 / 1_000, self.0 % 1_000)
    }
}

/// PWM counter double.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SimOutput {
    compare: u16,
    running: bool,
    torn_writes: u32,
    resumes: u32,
}

impl SimOutput {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            compare: 0,
            running: false,
            torn_writes: 0,
            resumes: 0,
        }
    }

    #[must_use]
    pub const fn compare(&self) -> u16 {
        self.compare
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Compare writes that landed while the counter was live.
    #[must_use]
    pub const fn torn_writes(&self) -> u32 {
        self.torn_writes
    }

    #[must_use]
    pub const fn resume_count(&self) -> u32 {
        self.resumes
    }
}

impl PeriodicOutput for SimOutput {
    fn pause(&mut self) {
        self.running = false;
    }

    fn resume(&mut self) {
        self.running = true;
        self.resumes = self.resumes.saturating_add(1);
    }

    fn set_compare(&mut self, value: u16) {
        if self.running {
            self.torn_writes = self.torn_writes.saturating_add(1);
        }
        self.compare = value;
    }
}

/// Indicator LED bank double.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SimIndicators {
    lit: IndicatorMask,
}

impl SimIndicators {
    /// Every LED starts lit, as an unconfigured port might leave them.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lit: IndicatorMask::ALL,
        }
    }

    #[must_use]
    pub const fn lit(&self) -> IndicatorMask {
        self.lit
    }
}

impl Indicator for SimIndicators {
    fn light(&mut self, mask: IndicatorMask) {
        self.lit = self.lit.union(mask);
    }

    fn clear(&mut self, mask: IndicatorMask) {
        self.lit = self.lit.without(mask);
    }
}

/// Sleep-depth double.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct SimPower {
    mode: Option<SleepMode>,
    changes: u32,
}

impl SimPower {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: None,
            changes: 0,
        }
    }

    /// Armed sleep depth, or `None` before the controller touched it.
    #[must_use]
    pub const fn mode(&self) -> Option<SleepMode> {
        self.mode
    }

    /// Number of times the armed depth actually changed.
    #[must_use]
    pub const fn changes(&self) -> u32 {
        self.changes
    }
}

impl PowerControl for SimPower {
    fn apply(&mut self, mode: SleepMode) {
        if self.mode != Some(mode) {
            self.changes = self.changes.saturating_add(1);
        }
        self.mode = Some(mode);
    }
}

/// Controller wired to simulated hardware.
pub type SimController =
    Controller<LatchedInput, SimOutput, SimIndicators, DeadlineTimer<SimInstant>, SimPower>;

/// Builds a [`SimController`] with the production debounce period.
#[must_use]
pub fn sim_controller() -> SimController {
    Controller::new(
        LatchedInput::new(),
        LatchedInput::new(),
        SimOutput::new(),
        SimIndicators::new(),
        DeadlineTimer::new(),
        SimPower::new(),
    )
}

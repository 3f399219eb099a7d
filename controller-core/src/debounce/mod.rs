//! Single-shot debounce countdown shared by both buttons.
//!
//! Every accepted edge restarts the countdown from zero, so a burst of
//! contact bounce keeps pushing the expiry out until the line settles. The
//! timer never re-arms itself after expiring.

use core::ops::Add;
use core::time::Duration;

/// Reference clock feeding the PWM and debounce counters (VLO-class oscillator).
pub const REFERENCE_CLOCK_HZ: u32 = 12_000;

/// Debounce countdown length in reference clock ticks.
pub const DEBOUNCE_TICKS: u32 = 750;

/// Debounce countdown length (750 ticks at 12 kHz).
pub const DEBOUNCE_PERIOD: Duration = ticks_to_duration(DEBOUNCE_TICKS);

/// Converts reference clock ticks to wall time.
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn ticks_to_duration(ticks: u32) -> Duration {
    let micros = (ticks as u64 * 1_000_000) / REFERENCE_CLOCK_HZ as u64;
    Duration::from_micros(micros)
}

/// Abstraction over the countdown hardware.
pub trait DebounceTimer {
    /// Monotonic timestamp type used for deadlines.
    type Instant: Copy + Ord;

    /// Stops the countdown if it is running and starts it again from zero.
    fn start(&mut self, now: Self::Instant);

    /// Stops the countdown without firing.
    fn stop(&mut self);

    /// Returns the instant the running countdown expires, if any.
    fn deadline(&self) -> Option<Self::Instant>;

    fn is_running(&self) -> bool {
        self.deadline().is_some()
    }

    /// Returns `true` once a running countdown has reached its deadline.
    fn is_expired(&self, now: Self::Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }
}

/// Countdown implemented as a deadline over any monotonic instant.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeadlineTimer<I> {
    period: Duration,
    deadline: Option<I>,
}

impl<I> DeadlineTimer<I> {
    /// Creates a stopped timer with [`DEBOUNCE_PERIOD`].
    #[must_use]
    pub const fn new() -> Self {
        Self::with_period(DEBOUNCE_PERIOD)
    }

    #[must_use]
    pub const fn with_period(period: Duration) -> Self {
        Self {
            period,
            deadline: None,
        }
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }
}

impl<I> Default for DeadlineTimer<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> DebounceTimer for DeadlineTimer<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    type Instant = I;

    fn start(&mut self, now: I) {
        self.deadline = Some(now + self.period);
    }

    fn stop(&mut self) {
        self.deadline = None;
    }

    fn deadline(&self) -> Option<I> {
        self.deadline
    }
}

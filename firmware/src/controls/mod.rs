//! Firmware-side glue for the shared controller.
//!
//! Wraps the Embassy monotonic clock so it can drive the core debounce timer
//! and telemetry, and converts the 0..=10 speed scale into timer compare
//! counts.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::ops::Add;
use core::time::Duration as CoreDuration;

use embassy_time::{Duration, Instant};
use fan_controller_core::debounce::DeadlineTimer;
use fan_controller_core::speed::SPEED_PERIOD;
use fan_controller_core::telemetry::TelemetryInstant;

/// PWM carrier frequency driven on the fan output.
pub const PWM_FREQUENCY_KHZ: u32 = 25;

/// Embassy instant usable as a core timestamp.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    #[cfg(test)]
    pub const fn from_micros(micros: u64) -> Self {
        Self(Instant::from_micros(micros))
    }

    pub const fn as_embassy(self) -> Instant {
        self.0
    }

    pub fn as_micros(self) -> u64 {
        self.0.as_micros()
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(value: Instant) -> Self {
        Self(value)
    }
}

impl Add<CoreDuration> for FirmwareInstant {
    type Output = Self;

    fn add(self, rhs: CoreDuration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        let ticks = Duration::from_micros(micros);
        Self(self.0.checked_add(ticks).unwrap_or(Instant::MAX))
    }
}

impl TelemetryInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> CoreDuration {
        let elapsed = self.0.saturating_duration_since(earlier.0);
        CoreDuration::from_micros(elapsed.as_micros())
    }
}

/// Debounce countdown on the Embassy clock.
pub type FirmwareDebounce = DeadlineTimer<FirmwareInstant>;

/// Maps a speed value onto a compare count for a timer whose full scale is
/// `max_compare`. Values above the speed period saturate at full scale.
pub fn compare_for(speed: u16, max_compare: u32) -> u32 {
    let speed = u64::from(speed.min(SPEED_PERIOD));
    let scaled = u64::from(max_compare) * speed / u64::from(SPEED_PERIOD);
    u32::try_from(scaled).unwrap_or(max_compare)
}

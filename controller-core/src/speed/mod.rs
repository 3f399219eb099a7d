//! Speed table shared by firmware and host targets.
//!
//! The controller exposes four fixed speed levels. Each level carries the PWM
//! compare value applied to the actuator output, the indicator LED that marks
//! it, and whether selecting it implies the actuator is switched on. The
//! table is immutable and compiled into the image.

use core::fmt;
use core::ops::BitOr;

/// Compare value for the "off" level.
pub const NO_SPEED_VALUE: u16 = 0;
/// Compare value for the low speed level.
pub const LOW_SPEED_VALUE: u16 = 4;
/// Compare value for the medium speed level.
pub const MID_SPEED_VALUE: u16 = 7;
/// Compare value for the full speed level.
pub const FULL_SPEED_VALUE: u16 = 10;

/// PWM period in reference clock ticks. Full speed is a 100% duty cycle.
pub const SPEED_PERIOD: u16 = FULL_SPEED_VALUE;

/// Number of entries in [`SPEED_TABLE`].
pub const LEVEL_COUNT: usize = 4;

/// Set of status indicators to light for a speed level.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct IndicatorMask(u8);

impl IndicatorMask {
    pub const NONE: Self = Self(0);
    pub const LOW: Self = Self(1 << 0);
    pub const MID: Self = Self(1 << 1);
    pub const FULL: Self = Self(1 << 2);
    pub const ALL: Self = Self(Self::LOW.0 | Self::MID.0 | Self::FULL.0);

    /// Builds a mask from raw bits, discarding bits with no indicator behind them.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` when every indicator in `other` is also set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Returns `self` with every indicator in `other` removed.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for IndicatorMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

/// Discrete speed levels selectable from the cycle button.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SpeedLevel {
    #[default]
    Off,
    Low,
    Mid,
    Full,
}

impl SpeedLevel {
    /// Every level in table order.
    pub const ALL: [SpeedLevel; LEVEL_COUNT] = [
        SpeedLevel::Off,
        SpeedLevel::Low,
        SpeedLevel::Mid,
        SpeedLevel::Full,
    ];

    /// Deterministic index for lookups into [`SPEED_TABLE`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            SpeedLevel::Off => 0,
            SpeedLevel::Low => 1,
            SpeedLevel::Mid => 2,
            SpeedLevel::Full => 3,
        }
    }

    /// Attempts to construct a [`SpeedLevel`] from a raw table index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(SpeedLevel::Off),
            1 => Some(SpeedLevel::Low),
            2 => Some(SpeedLevel::Mid),
            3 => Some(SpeedLevel::Full),
            _ => None,
        }
    }

    /// Level selected by the next cycle press. Full wraps back to Off.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            SpeedLevel::Off => SpeedLevel::Low,
            SpeedLevel::Low => SpeedLevel::Mid,
            SpeedLevel::Mid => SpeedLevel::Full,
            SpeedLevel::Full => SpeedLevel::Off,
        }
    }

    /// Table entry describing this level.
    #[must_use]
    pub const fn state(self) -> SpeedState {
        SPEED_TABLE[self.as_index()]
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            SpeedLevel::Off => "off",
            SpeedLevel::Low => "low",
            SpeedLevel::Mid => "mid",
            SpeedLevel::Full => "full",
        }
    }
}

impl fmt::Display for SpeedLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One row of the speed table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SpeedState {
    pub level: SpeedLevel,
    pub speed_value: u16,
    pub indicator: IndicatorMask,
    pub enabled_by_default: bool,
}

impl SpeedState {
    pub const fn new(
        level: SpeedLevel,
        speed_value: u16,
        indicator: IndicatorMask,
        enabled_by_default: bool,
    ) -> Self {
        Self {
            level,
            speed_value,
            indicator,
            enabled_by_default,
        }
    }
}

/// Compile-time catalog of every speed level, indexed by [`SpeedLevel::as_index`].
pub const SPEED_TABLE: [SpeedState; LEVEL_COUNT] = [
    SpeedState::new(SpeedLevel::Off, NO_SPEED_VALUE, IndicatorMask::NONE, false),
    SpeedState::new(SpeedLevel::Low, LOW_SPEED_VALUE, IndicatorMask::LOW, true),
    SpeedState::new(SpeedLevel::Mid, MID_SPEED_VALUE, IndicatorMask::MID, true),
    SpeedState::new(SpeedLevel::Full, FULL_SPEED_VALUE, IndicatorMask::FULL, true),
];

/// Status indicator outputs, one per non-zero speed level.
pub trait Indicator {
    /// Drives every indicator in `mask` on.
    fn light(&mut self, mask: IndicatorMask);

    /// Drives every indicator in `mask` off.
    fn clear(&mut self, mask: IndicatorMask);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_entry_has_no_speed_or_indicator() {
        let off = SPEED_TABLE[0];
        assert_eq!(off.level, SpeedLevel::Off);
        assert_eq!(off.speed_value, 0);
        assert!(off.indicator.is_empty());
        assert!(!off.enabled_by_default);
    }

    #[test]
    fn active_levels_increase_with_distinct_indicators() {
        let active = &SPEED_TABLE[1..];
        for pair in active.windows(2) {
            assert!(pair[0].speed_value < pair[1].speed_value);
            assert_ne!(pair[0].indicator, pair[1].indicator);
        }
        for entry in active {
            assert!(!entry.indicator.is_empty());
            assert!(entry.enabled_by_default);
            assert!(entry.speed_value <= SPEED_PERIOD);
            assert_eq!(entry.indicator.bits().count_ones(), 1);
        }
        assert_eq!(SPEED_TABLE[3].speed_value, SPEED_PERIOD);
    }

    #[test]
    fn table_rows_match_their_levels() {
        for level in SpeedLevel::ALL {
            assert_eq!(level.state().level, level);
            assert_eq!(SpeedLevel::from_index(level.as_index()), Some(level));
        }
        assert_eq!(SpeedLevel::from_index(LEVEL_COUNT), None);
    }

    #[test]
    fn next_wraps_from_full_to_off() {
        assert_eq!(SpeedLevel::Off.next(), SpeedLevel::Low);
        assert_eq!(SpeedLevel::Mid.next(), SpeedLevel::Full);
        assert_eq!(SpeedLevel::Full.next(), SpeedLevel::Off);
    }

    #[test]
    fn indicator_mask_set_operations() {
        let both = IndicatorMask::LOW | IndicatorMask::FULL;
        assert!(both.contains(IndicatorMask::LOW));
        assert!(!both.contains(IndicatorMask::MID));
        assert_eq!(both.without(IndicatorMask::LOW), IndicatorMask::FULL);
        assert_eq!(IndicatorMask::from_bits(0xFF), IndicatorMask::ALL);
    }
}

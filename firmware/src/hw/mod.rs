//! STM32G0 implementations of the controller hardware seams.
//!
//! - [`PwmOutput`]: TIM3 channel 1 on PA6.
//! - [`LedBank`]: three push-pull LEDs, active high.
//! - [`ScbPowerControl`]: arms Stop or plain Sleep through `SCB.SLEEPDEEP`.

use cortex_m::peripheral::SCB;
use embassy_stm32::Peri;
use embassy_stm32::gpio::Output;
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::low_level::{OutputCompareMode, Timer};
use embassy_stm32::timer::simple_pwm::PwmPin;
use embassy_stm32::timer::{Ch1, Channel, GeneralInstance4Channel};
use fan_controller_core::duty::PeriodicOutput;
use fan_controller_core::power::{PowerControl, SleepMode};
use fan_controller_core::speed::{Indicator, IndicatorMask};

use crate::controls::compare_for;

/// Fan PWM on channel 1 of a general-purpose timer.
///
/// `pause` clears the counter enable bit, so the counter holds its value and
/// the pin holds its level while the compare register is rewritten. The
/// channel output itself stays enabled.
pub struct PwmOutput<'d, T: GeneralInstance4Channel> {
    timer: Timer<'d, T>,
    _pin: PwmPin<'d, T, Ch1>,
}

impl<'d, T: GeneralInstance4Channel> PwmOutput<'d, T> {
    /// Configures PWM mode 1 on channel 1 and leaves the counter stopped.
    pub fn new(tim: Peri<'d, T>, pin: PwmPin<'d, T, Ch1>, frequency: Hertz) -> Self {
        let timer = Timer::new(tim);
        timer.stop();
        timer.set_frequency(frequency);
        timer.set_output_compare_mode(Channel::Ch1, OutputCompareMode::PwmMode1);
        timer.set_output_compare_preload(Channel::Ch1, true);
        timer.set_compare_value(Channel::Ch1, 0);
        timer.enable_channel(Channel::Ch1, true);

        Self { timer, _pin: pin }
    }
}

impl<T: GeneralInstance4Channel> PeriodicOutput for PwmOutput<'_, T> {
    fn pause(&mut self) {
        self.timer.stop();
    }

    fn resume(&mut self) {
        self.timer.start();
    }

    fn set_compare(&mut self, value: u16) {
        let compare = compare_for(value, self.timer.get_max_compare_value());
        self.timer.set_compare_value(Channel::Ch1, compare);
    }
}

pub struct LedBank<'d> {
    low: Output<'d>,
    mid: Output<'d>,
    full: Output<'d>,
}

impl<'d> LedBank<'d> {
    pub fn new(low: Output<'d>, mid: Output<'d>, full: Output<'d>) -> Self {
        Self { low, mid, full }
    }

    fn leds(&mut self) -> [(IndicatorMask, &mut Output<'d>); 3] {
        [
            (IndicatorMask::LOW, &mut self.low),
            (IndicatorMask::MID, &mut self.mid),
            (IndicatorMask::FULL, &mut self.full),
        ]
    }
}

impl Indicator for LedBank<'_> {
    fn light(&mut self, mask: IndicatorMask) {
        for (bit, led) in self.leds() {
            if mask.contains(bit) {
                led.set_high();
            }
        }
    }

    fn clear(&mut self, mask: IndicatorMask) {
        for (bit, led) in self.leds() {
            if mask.contains(bit) {
                led.set_low();
            }
        }
    }
}

/// Selects the depth entered on the executor's next `WFE`.
///
/// With `SLEEPDEEP` set the G0 drops into Stop and the timer clocks halt;
/// the EXTI lines still wake it. Cleared, the core only gates its own clock
/// so TIM1 (time driver) and TIM3 (PWM) keep running.
pub struct ScbPowerControl {
    scb: SCB,
}

impl ScbPowerControl {
    pub fn new(scb: SCB) -> Self {
        Self { scb }
    }
}

impl PowerControl for ScbPowerControl {
    fn apply(&mut self, mode: SleepMode) {
        match mode {
            SleepMode::Stop => self.scb.set_sleepdeep(),
            SleepMode::Sleep => self.scb.clear_sleepdeep(),
        }
        defmt::debug!("power: armed {}", mode.label());
    }
}

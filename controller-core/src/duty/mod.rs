//! Duty-cycle driver for the actuator PWM output.
//!
//! The compare register is only ever written while the PWM counter is
//! stopped. [`DutyCycleDriver::pause`] hands out a [`PausedOutput`] guard,
//! which is the only type that can write a new speed, and the counter starts
//! again when the guard is resumed or dropped.

use crate::speed::SPEED_PERIOD;

/// Periodic counter plus the compare register that sets its duty cycle.
pub trait PeriodicOutput {
    /// Halts the counter. The output holds its current level.
    fn pause(&mut self);

    /// Restarts the counter in up-count mode.
    fn resume(&mut self);

    /// Writes the compare value, in ticks of [`SPEED_PERIOD`].
    fn set_compare(&mut self, value: u16);
}

pub struct DutyCycleDriver<O> {
    output: O,
    applied: u16,
}

impl<O: PeriodicOutput> DutyCycleDriver<O> {
    /// Takes ownership of `output`, leaving its counter stopped with `initial` loaded.
    pub fn new(mut output: O, initial: u16) -> Self {
        let initial = initial.min(SPEED_PERIOD);
        output.pause();
        output.set_compare(initial);
        Self {
            output,
            applied: initial,
        }
    }

    /// Stops the counter so the compare value can be changed.
    pub fn pause(&mut self) -> PausedOutput<'_, O> {
        self.output.pause();
        PausedOutput { driver: self }
    }

    /// Last compare value written to the output.
    pub fn applied(&self) -> u16 {
        self.applied
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }
}

/// Borrow of a [`DutyCycleDriver`] whose counter is stopped.
pub struct PausedOutput<'a, O: PeriodicOutput> {
    driver: &'a mut DutyCycleDriver<O>,
}

impl<O: PeriodicOutput> PausedOutput<'_, O> {
    /// Loads a new compare value, clamped to the PWM period.
    pub fn set_speed(&mut self, value: u16) {
        let value = value.min(SPEED_PERIOD);
        self.driver.output.set_compare(value);
        self.driver.applied = value;
    }

    /// Restarts the counter.
    pub fn resume(self) {}
}

impl<O: PeriodicOutput> Drop for PausedOutput<'_, O> {
    fn drop(&mut self) {
        self.driver.output.resume();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimOutput;

    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    enum Call {
        Pause,
        Compare(u16),
        Resume,
    }

    #[derive(Default)]
    struct CallLog {
        calls: heapless::Vec<Call, 8>,
    }

    impl PeriodicOutput for CallLog {
        fn pause(&mut self) {
            self.calls.push(Call::Pause).unwrap();
        }

        fn resume(&mut self) {
            self.calls.push(Call::Resume).unwrap();
        }

        fn set_compare(&mut self, value: u16) {
            self.calls.push(Call::Compare(value)).unwrap();
        }
    }

    #[test]
    fn compare_write_is_bracketed_by_counter_stop_and_start() {
        let mut driver = DutyCycleDriver::new(CallLog::default(), 0);
        driver.pause().set_speed(SPEED_PERIOD);
        {
            let paused = driver.pause();
            paused.resume();
        }

        assert_eq!(
            driver.output().calls.as_slice(),
            &[
                Call::Pause,
                Call::Compare(0),
                Call::Pause,
                Call::Compare(SPEED_PERIOD),
                Call::Resume,
                Call::Pause,
                Call::Resume,
            ]
        );
    }

    #[test]
    fn new_driver_leaves_counter_stopped() {
        let driver = DutyCycleDriver::new(SimOutput::new(), 0);
        assert!(!driver.output().is_running());
        assert_eq!(driver.applied(), 0);
    }

    #[test]
    fn writes_happen_only_while_paused() {
        let mut driver = DutyCycleDriver::new(SimOutput::new(), 0);
        {
            let mut paused = driver.pause();
            paused.set_speed(7);
            paused.resume();
        }
        assert!(driver.output().is_running());
        assert_eq!(driver.output().compare(), 7);
        assert_eq!(driver.output().torn_writes(), 0);
    }

    #[test]
    fn dropping_the_guard_resumes_the_counter() {
        let mut driver = DutyCycleDriver::new(SimOutput::new(), 0);
        {
            let mut paused = driver.pause();
            paused.set_speed(4);
        }
        assert!(driver.output().is_running());
        assert_eq!(driver.output().resume_count(), 1);
    }

    #[test]
    fn speed_is_clamped_to_period() {
        let mut driver = DutyCycleDriver::new(SimOutput::new(), 0);
        driver.pause().set_speed(SPEED_PERIOD + 5);
        assert_eq!(driver.applied(), SPEED_PERIOD);
    }
}

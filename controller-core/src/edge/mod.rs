//! Falling-edge detectors for the two push-buttons.
//!
//! A detector owns no timing. Servicing an edge raises the button's request
//! (superseding any other pending request), restarts the shared debounce
//! countdown, keeps the processor clocked on return, and re-arms the line.

use core::fmt;

use crate::debounce::DebounceTimer;
use crate::power::{PowerControl, PowerModeController};
use crate::state::{ControllerContext, Request};

/// Physical push-buttons. Both are active-low with pull-ups.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Button {
    CycleSpeed,
    ToggleEnable,
}

impl Button {
    pub const ALL: [Button; 2] = [Button::CycleSpeed, Button::ToggleEnable];

    /// Request raised when this button is pressed.
    #[must_use]
    pub const fn request(self) -> Request {
        match self {
            Button::CycleSpeed => Request::CycleSpeed,
            Button::ToggleEnable => Request::ToggleEnable,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Button::CycleSpeed => "cycle",
            Button::ToggleEnable => "toggle",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Edge-detect interrupt line as seen by the controller.
pub trait DigitalInput {
    /// Returns `true` when the line's edge interrupt is enabled.
    fn interrupt_enabled(&self) -> bool;

    /// Returns `true` when a high-to-low transition has been latched.
    fn edge_pending(&self) -> bool;

    /// Clears the latched edge so the next transition is seen.
    fn clear_edge(&mut self);
}

/// Software edge latch for targets where an async driver observes the pin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LatchedInput {
    enabled: bool,
    pending: bool,
}

impl LatchedInput {
    /// Interrupt enabled, no edge latched.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            enabled: true,
            pending: false,
        }
    }

    /// Records a falling edge.
    pub fn latch(&mut self) {
        self.pending = true;
    }

    pub fn set_interrupt_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Default for LatchedInput {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitalInput for LatchedInput {
    fn interrupt_enabled(&self) -> bool {
        self.enabled
    }

    fn edge_pending(&self) -> bool {
        self.pending
    }

    fn clear_edge(&mut self) {
        self.pending = false;
    }
}

/// Outcome of servicing an accepted edge.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EdgeReport {
    pub button: Button,
    /// Request that was pending and has now been discarded.
    pub superseded: Option<Request>,
}

pub struct EdgeDetector<I> {
    button: Button,
    input: I,
}

impl<I: DigitalInput> EdgeDetector<I> {
    pub const fn new(button: Button, input: I) -> Self {
        Self { button, input }
    }

    pub fn button(&self) -> Button {
        self.button
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Converts a latched edge into a pending request and a debounce restart.
    ///
    /// Returns `None` when no edge is latched or the line's interrupt is
    /// disabled; a latched edge on a disabled line stays latched.
    pub fn service<T, P>(
        &mut self,
        ctx: &mut ControllerContext,
        debounce: &mut T,
        power: &mut PowerModeController<P>,
        now: T::Instant,
    ) -> Option<EdgeReport>
    where
        T: DebounceTimer,
        P: PowerControl,
    {
        if !self.input.edge_pending() || !self.input.interrupt_enabled() {
            return None;
        }

        let superseded = ctx.pending.raise(self.button.request());
        debounce.start(now);
        power.hold_awake();
        self.input.clear_edge();

        Some(EdgeReport {
            button: self.button,
            superseded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::{DEBOUNCE_PERIOD, DeadlineTimer};
    use crate::power::SleepMode;
    use crate::sim::{SimInstant, SimPower};

    struct Fixture {
        ctx: ControllerContext,
        timer: DeadlineTimer<SimInstant>,
        power: PowerModeController<SimPower>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ctx: ControllerContext::new(),
                timer: DeadlineTimer::new(),
                power: PowerModeController::new(SimPower::new()),
            }
        }

        fn service(
            &mut self,
            detector: &mut EdgeDetector<LatchedInput>,
            now: SimInstant,
        ) -> Option<EdgeReport> {
            detector.service(&mut self.ctx, &mut self.timer, &mut self.power, now)
        }
    }

    #[test]
    fn edge_raises_request_and_starts_timer() {
        let mut fixture = Fixture::new();
        let mut detector = EdgeDetector::new(Button::CycleSpeed, LatchedInput::new());
        detector.input_mut().latch();

        let now = SimInstant::from_millis(3);
        let report = fixture.service(&mut detector, now).expect("edge accepted");

        assert_eq!(report.button, Button::CycleSpeed);
        assert_eq!(report.superseded, None);
        assert_eq!(fixture.ctx.pending.peek(), Some(Request::CycleSpeed));
        assert_eq!(fixture.timer.deadline(), Some(now + DEBOUNCE_PERIOD));
        assert_eq!(fixture.power.mode(), SleepMode::Sleep);
        assert!(!detector.input().edge_pending());
    }

    #[test]
    fn no_latched_edge_is_a_no_op() {
        let mut fixture = Fixture::new();
        let mut detector = EdgeDetector::new(Button::ToggleEnable, LatchedInput::new());

        assert!(fixture.service(&mut detector, SimInstant::ZERO).is_none());
        assert!(fixture.ctx.pending.is_empty());
        assert!(!fixture.timer.is_running());
    }

    #[test]
    fn disabled_interrupt_leaves_edge_latched() {
        let mut fixture = Fixture::new();
        let mut detector = EdgeDetector::new(Button::ToggleEnable, LatchedInput::new());
        detector.input_mut().set_interrupt_enabled(false);
        detector.input_mut().latch();

        assert!(fixture.service(&mut detector, SimInstant::ZERO).is_none());
        assert!(detector.input().edge_pending());
        assert_eq!(fixture.power.mode(), SleepMode::Stop);
    }

    #[test]
    fn other_button_supersedes_pending_request() {
        let mut fixture = Fixture::new();
        let mut cycle = EdgeDetector::new(Button::CycleSpeed, LatchedInput::new());
        let mut toggle = EdgeDetector::new(Button::ToggleEnable, LatchedInput::new());

        cycle.input_mut().latch();
        fixture.service(&mut cycle, SimInstant::ZERO);
        toggle.input_mut().latch();
        let report = fixture
            .service(&mut toggle, SimInstant::from_millis(10))
            .expect("edge accepted");

        assert_eq!(report.superseded, Some(Request::CycleSpeed));
        assert_eq!(fixture.ctx.pending.peek(), Some(Request::ToggleEnable));
        assert_eq!(
            fixture.timer.deadline(),
            Some(SimInstant::from_millis(10) + DEBOUNCE_PERIOD)
        );
    }
}

//! Controller composition and the single-threaded event loop it serves.
//!
//! [`Controller`] owns the [`ControllerContext`] and every hardware seam.
//! Edge events and debounce expiry are the only inputs; each handler runs to
//! completion before the next event is taken, so the context needs no
//! locking. Targets feed it from a one-slot, overwrite-in-place event source
//! and sleep until either the next edge or the debounce deadline.

use crate::debounce::DebounceTimer;
use crate::duty::{DutyCycleDriver, PeriodicOutput};
use crate::edge::{Button, DigitalInput, EdgeDetector, EdgeReport, LatchedInput};
use crate::power::{PowerControl, PowerModeController, SleepMode};
use crate::speed::{Indicator, IndicatorMask};
use crate::state::{ControllerContext, ControllerState, Request, transition};

/// Input observed by the controller event loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControlEvent {
    Edge(Button),
    DebounceExpired,
}

/// Summary of one debounce expiry pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DispatchReport {
    /// Request that was applied, or `None` when nothing was pending.
    pub request: Option<Request>,
    pub state: ControllerState,
    pub sleep_mode: SleepMode,
}

/// Result of [`Controller::handle`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ControlOutcome {
    /// An edge was accepted.
    Edge(EdgeReport),
    /// The edge line was masked or had nothing latched.
    EdgeIgnored(Button),
    Dispatched(DispatchReport),
    /// Expiry fired for a timer that was stopped or not yet due.
    SpuriousExpiry,
}

pub struct Controller<I, O, L, T, P> {
    ctx: ControllerContext,
    cycle: EdgeDetector<I>,
    toggle: EdgeDetector<I>,
    duty: DutyCycleDriver<O>,
    indicators: L,
    debounce: T,
    power: PowerModeController<P>,
}

impl<I, O, L, T, P> Controller<I, O, L, T, P>
where
    I: DigitalInput,
    O: PeriodicOutput,
    L: Indicator,
    T: DebounceTimer,
    P: PowerControl,
{
    /// Brings the controller up in the off state: indicators dark, PWM
    /// stopped at zero duty, debounce idle, deepest sleep armed.
    pub fn new(
        cycle_input: I,
        toggle_input: I,
        output: O,
        mut indicators: L,
        mut debounce: T,
        power: P,
    ) -> Self {
        let ctx = ControllerContext::new();
        indicators.clear(IndicatorMask::ALL);
        debounce.stop();

        Self {
            ctx,
            cycle: EdgeDetector::new(Button::CycleSpeed, cycle_input),
            toggle: EdgeDetector::new(Button::ToggleEnable, toggle_input),
            duty: DutyCycleDriver::new(output, ctx.state.output_duty()),
            indicators,
            debounce,
            power: PowerModeController::new(power),
        }
    }

    /// Services the edge interrupt for `button`.
    pub fn on_edge_interrupt(&mut self, button: Button, now: T::Instant) -> Option<EdgeReport> {
        let detector = match button {
            Button::CycleSpeed => &mut self.cycle,
            Button::ToggleEnable => &mut self.toggle,
        };
        detector.service(&mut self.ctx, &mut self.debounce, &mut self.power, now)
    }

    /// Runs the debounce expiry pass.
    ///
    /// Stops the countdown, applies the pending request (if any) with the PWM
    /// counter paused, then re-selects the sleep depth. Returns `None` when
    /// the countdown is not running or not yet due.
    pub fn on_debounce_expired(&mut self, now: T::Instant) -> Option<DispatchReport> {
        if !self.debounce.is_expired(now) {
            return None;
        }
        self.debounce.stop();

        let mut paused = self.duty.pause();
        let request = self.ctx.pending.take();
        if let Some(request) = request {
            let step = transition(&self.ctx.state, request);
            self.indicators.clear(step.clear);
            self.indicators.light(step.light);
            paused.set_speed(step.duty);
            self.ctx.state = step.next;
        }
        paused.resume();

        let sleep_mode = self.power.select_for(self.ctx.state.enabled);

        Some(DispatchReport {
            request,
            state: self.ctx.state,
            sleep_mode,
        })
    }

    /// Dispatches one event from the event loop.
    pub fn dispatch(&mut self, event: ControlEvent, now: T::Instant) -> ControlOutcome {
        match event {
            ControlEvent::Edge(button) => match self.on_edge_interrupt(button, now) {
                Some(report) => ControlOutcome::Edge(report),
                None => ControlOutcome::EdgeIgnored(button),
            },
            ControlEvent::DebounceExpired => match self.on_debounce_expired(now) {
                Some(report) => ControlOutcome::Dispatched(report),
                None => ControlOutcome::SpuriousExpiry,
            },
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.ctx.state
    }

    pub fn context(&self) -> &ControllerContext {
        &self.ctx
    }

    pub fn pending(&self) -> Option<Request> {
        self.ctx.pending.peek()
    }

    /// Instant the running debounce countdown expires, if any.
    pub fn debounce_deadline(&self) -> Option<T::Instant> {
        self.debounce.deadline()
    }

    pub fn sleep_mode(&self) -> SleepMode {
        self.power.mode()
    }

    /// Compare value currently loaded into the PWM output.
    pub fn applied_duty(&self) -> u16 {
        self.duty.applied()
    }

    pub fn output(&self) -> &O {
        self.duty.output()
    }

    pub fn indicators(&self) -> &L {
        &self.indicators
    }

    pub fn power_control(&self) -> &P {
        self.power.control()
    }

    pub fn detector(&self, button: Button) -> &EdgeDetector<I> {
        match button {
            Button::CycleSpeed => &self.cycle,
            Button::ToggleEnable => &self.toggle,
        }
    }

    pub fn detector_mut(&mut self, button: Button) -> &mut EdgeDetector<I> {
        match button {
            Button::CycleSpeed => &mut self.cycle,
            Button::ToggleEnable => &mut self.toggle,
        }
    }
}

impl<O, L, T, P> Controller<LatchedInput, O, L, T, P>
where
    O: PeriodicOutput,
    L: Indicator,
    T: DebounceTimer,
    P: PowerControl,
{
    /// Latches a falling edge on `button` and services it.
    pub fn press(&mut self, button: Button, now: T::Instant) -> Option<EdgeReport> {
        self.detector_mut(button).input_mut().latch();
        self.on_edge_interrupt(button, now)
    }

    /// Event-loop entry point for targets whose edges arrive as events.
    pub fn handle(&mut self, event: ControlEvent, now: T::Instant) -> ControlOutcome {
        if let ControlEvent::Edge(button) = event {
            self.detector_mut(button).input_mut().latch();
        }
        self.dispatch(event, now)
    }
}

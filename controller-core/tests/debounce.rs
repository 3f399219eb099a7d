use core::time::Duration;

use fan_controller_core::controller::{ControlEvent, ControlOutcome};
use fan_controller_core::debounce::DEBOUNCE_PERIOD;
use fan_controller_core::edge::Button;
use fan_controller_core::sim::{SimInstant, sim_controller};
use fan_controller_core::speed::SpeedLevel;
use fan_controller_core::state::Request;
use fan_controller_core::telemetry::{TelemetryEventKind, TelemetryRecorder};

#[test]
fn later_edge_supersedes_earlier_request() {
    let mut controller = sim_controller();
    controller.press(Button::CycleSpeed, SimInstant::ZERO);

    let second = SimInstant::from_millis(30);
    let report = controller
        .press(Button::ToggleEnable, second)
        .expect("edge accepted");
    assert_eq!(report.superseded, Some(Request::CycleSpeed));

    // The first edge's deadline has passed but the countdown was restarted.
    let first_deadline = SimInstant::ZERO + DEBOUNCE_PERIOD;
    assert!(controller.on_debounce_expired(first_deadline).is_none());

    let dispatch = controller
        .on_debounce_expired(second + DEBOUNCE_PERIOD)
        .expect("dispatch after restarted countdown");
    assert_eq!(dispatch.request, Some(Request::ToggleEnable));
    assert_eq!(controller.state().level, SpeedLevel::Off);
    assert!(controller.state().enabled);
}

#[test]
fn bounce_burst_postpones_dispatch_until_quiet() {
    let mut controller = sim_controller();
    let spacing = Duration::from_millis(5);
    let mut now = SimInstant::ZERO;

    for _ in 0..8 {
        controller.press(Button::CycleSpeed, now);
        now = now + spacing;
        assert!(controller.on_debounce_expired(now).is_none());
    }

    let last_edge = SimInstant::from_millis(35);
    assert_eq!(
        controller.debounce_deadline(),
        Some(last_edge + DEBOUNCE_PERIOD)
    );

    let dispatch = controller
        .on_debounce_expired(last_edge + DEBOUNCE_PERIOD)
        .expect("dispatch once bouncing stops");
    assert_eq!(dispatch.request, Some(Request::CycleSpeed));
    assert_eq!(controller.state().level, SpeedLevel::Low);
}

#[test]
fn expiry_is_one_shot() {
    let mut controller = sim_controller();
    controller.press(Button::CycleSpeed, SimInstant::ZERO);
    let due = SimInstant::ZERO + DEBOUNCE_PERIOD;

    assert!(matches!(
        controller.handle(ControlEvent::DebounceExpired, due),
        ControlOutcome::Dispatched(_)
    ));
    assert_eq!(controller.debounce_deadline(), None);
    assert_eq!(
        controller.handle(ControlEvent::DebounceExpired, due + DEBOUNCE_PERIOD),
        ControlOutcome::SpuriousExpiry
    );
    assert_eq!(controller.state().level, SpeedLevel::Low);
}

#[test]
fn telemetry_captures_supersession_and_dispatch() {
    let mut controller = sim_controller();
    let mut telemetry = TelemetryRecorder::<SimInstant, 16>::new();

    let events = [
        (ControlEvent::Edge(Button::CycleSpeed), SimInstant::ZERO),
        (
            ControlEvent::Edge(Button::ToggleEnable),
            SimInstant::from_millis(10),
        ),
        (
            ControlEvent::DebounceExpired,
            SimInstant::from_millis(10) + DEBOUNCE_PERIOD,
        ),
    ];
    for (event, now) in events {
        let outcome = controller.handle(event, now);
        telemetry.record_outcome(&outcome, now);
    }

    let kinds: Vec<TelemetryEventKind> = telemetry.oldest_first().map(|r| r.event).collect();
    assert_eq!(
        kinds,
        vec![
            TelemetryEventKind::EdgeAccepted(Button::CycleSpeed),
            TelemetryEventKind::EdgeAccepted(Button::ToggleEnable),
            TelemetryEventKind::RequestSuperseded(Request::CycleSpeed),
            TelemetryEventKind::Dispatched(Request::ToggleEnable),
            TelemetryEventKind::SleepModeSelected(
                fan_controller_core::power::SleepMode::Sleep
            ),
        ]
    );
}

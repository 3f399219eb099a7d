use embassy_futures::select::{Either, select};
use embassy_time::Timer;
use fan_controller_core::controller::ControlEvent;

use super::{EdgeSignal, FirmwareController};
use crate::controls::FirmwareInstant;
use crate::telemetry::FirmwareTelemetry;

/// Single consumer of button edges and debounce expiry.
///
/// Each event runs to completion against the controller before the next one
/// is awaited.
#[embassy_executor::task]
pub async fn run(
    mut controller: FirmwareController,
    events: &'static EdgeSignal,
    mut telemetry: FirmwareTelemetry,
) -> ! {
    loop {
        let event = match controller.debounce_deadline() {
            Some(deadline) => {
                match select(events.wait(), Timer::at(deadline.as_embassy())).await {
                    Either::First(button) => ControlEvent::Edge(button),
                    Either::Second(()) => ControlEvent::DebounceExpired,
                }
            }
            None => ControlEvent::Edge(events.wait().await),
        };

        let now = FirmwareInstant::now();
        let outcome = controller.handle(event, now);
        telemetry.record(&outcome, now);
    }
}

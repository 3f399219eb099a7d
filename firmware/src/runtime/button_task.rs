use embassy_stm32::exti::ExtiInput;
use fan_controller_core::edge::Button;

use super::EdgeSignal;

/// Forwards every falling edge on `line` to the control task.
///
/// No filtering happens here; bounce is absorbed by the shared debounce
/// countdown.
#[embassy_executor::task(pool_size = 2)]
pub async fn run(mut line: ExtiInput<'static>, button: Button, events: &'static EdgeSignal) -> ! {
    loop {
        line.wait_for_falling_edge().await;
        events.signal(button);
    }
}

use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, OutputType, Pull, Speed};
use embassy_stm32::peripherals::TIM3;
use embassy_stm32::time::khz;
use embassy_stm32::timer::simple_pwm::PwmPin;
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::signal::Signal;
use fan_controller_core::controller::Controller;
use fan_controller_core::edge::{Button, LatchedInput};

use crate::controls::{FirmwareDebounce, PWM_FREQUENCY_KHZ};
use crate::hw::{LedBank, PwmOutput, ScbPowerControl};
use crate::telemetry::FirmwareTelemetry;

mod button_task;
mod control_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

/// Latest unserviced button edge. A newer edge overwrites an older one.
pub(super) type EdgeSignal = Signal<ThreadModeRawMutex, Button>;

pub(super) type FirmwareController = Controller<
    LatchedInput,
    PwmOutput<'static, TIM3>,
    LedBank<'static>,
    FirmwareDebounce,
    ScbPowerControl,
>;

pub(super) static EDGE_EVENTS: EdgeSignal = Signal::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA0,
        PA1,
        PA6,
        PB3,
        PB4,
        PB5,
        EXTI0,
        EXTI1,
        TIM3,
        ..
    } = hal::init(config);
    let cortex = cortex_m::Peripherals::take().expect("core peripherals already taken");

    let cycle_button = ExtiInput::new(PA0, EXTI0, Pull::Up);
    let toggle_button = ExtiInput::new(PA1, EXTI1, Pull::Up);

    let pwm = PwmOutput::new(
        TIM3,
        PwmPin::new(PA6, OutputType::PushPull),
        khz(PWM_FREQUENCY_KHZ),
    );
    let leds = LedBank::new(
        Output::new(PB3, Level::Low, Speed::Low),
        Output::new(PB4, Level::Low, Speed::Low),
        Output::new(PB5, Level::Low, Speed::Low),
    );

    let controller: FirmwareController = Controller::new(
        LatchedInput::new(),
        LatchedInput::new(),
        pwm,
        leds,
        FirmwareDebounce::new(),
        ScbPowerControl::new(cortex.SCB),
    );
    defmt::info!("fan controller ready: {}", defmt::Display2Format(controller.state()));

    spawner
        .spawn(control_task::run(controller, &EDGE_EVENTS, FirmwareTelemetry::new()))
        .expect("failed to spawn control task");

    spawner
        .spawn(button_task::run(cycle_button, Button::CycleSpeed, &EDGE_EVENTS))
        .expect("failed to spawn cycle button task");
    spawner
        .spawn(button_task::run(toggle_button, Button::ToggleEnable, &EDGE_EVENTS))
        .expect("failed to spawn toggle button task");

    core::future::pending::<()>().await;
}

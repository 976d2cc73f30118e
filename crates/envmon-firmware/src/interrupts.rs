//! Timer interrupts and the state they share with the main loop
//!
//! Two timer-group timers drive the monitor:
//!
//! - a one-shot timer re-armed from its own handler with whatever delay the
//!   dust pulse machine asks for (280 µs, then 9 720 µs, repeat)
//! - a periodic timer that only raises the report due flag
//!
//! The pulse handler runs at a higher priority than the report handler so
//! the LED timing is never held up by the slower cadence.

use core::cell::RefCell;

use critical_section::Mutex;
use esp_hal::Blocking;
use esp_hal::gpio::Output;
use esp_hal::handler;
use esp_hal::interrupt::Priority;
use esp_hal::time::Duration;
use esp_hal::timer::{OneShotTimer, PeriodicTimer};
use fugit::{MicrosDurationU32, MillisDurationU32};
use log::{error, info};

use envmon_core::{DustPulse, DustSlot, ReportScheduler, SharedConverter};

use crate::board::BoardSampler;

pub static CONVERTER: SharedConverter<BoardSampler> = SharedConverter::new();
pub static DUST_SLOT: DustSlot = DustSlot::new();
pub static SCHEDULER: ReportScheduler = ReportScheduler::new();

pub type BoardPulse = DustPulse<'static, Output<'static>, BoardSampler>;

static PULSE: Mutex<RefCell<Option<BoardPulse>>> = Mutex::new(RefCell::new(None));
static PULSE_TIMER: Mutex<RefCell<Option<OneShotTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));
static REPORT_TIMER: Mutex<RefCell<Option<PeriodicTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));

fn to_duration(delay: MicrosDurationU32) -> Duration {
    Duration::from_micros(delay.ticks() as u64)
}

/// Hand the pulse machine and its timer to the interrupt and arm the first
/// firing.
pub fn start_dust_pulse(pulse: BoardPulse, mut timer: OneShotTimer<'static, Blocking>) {
    timer.set_interrupt_handler(dust_pulse);
    let first = to_duration(pulse.initial_delay());

    critical_section::with(|cs| {
        timer.listen();
        if let Err(e) = timer.schedule(first) {
            error!("Dust pulse timer arm failed: {:?}", e);
        }
        PULSE.borrow_ref_mut(cs).replace(pulse);
        PULSE_TIMER.borrow_ref_mut(cs).replace(timer);
    });
    info!("Dust pulse started");
}

/// Start the report cadence.
pub fn start_report_timer(mut timer: PeriodicTimer<'static, Blocking>, period: MillisDurationU32) {
    timer.set_interrupt_handler(report_tick);

    critical_section::with(|cs| {
        timer.listen();
        if let Err(e) = timer.start(Duration::from_millis(period.ticks() as u64)) {
            error!("Report timer start failed: {:?}", e);
        }
        REPORT_TIMER.borrow_ref_mut(cs).replace(timer);
    });
    info!("Report timer started, period {} ms", period.ticks());
}

#[handler(priority = Priority::Priority3)]
fn dust_pulse() {
    critical_section::with(|cs| {
        let mut timer = PULSE_TIMER.borrow_ref_mut(cs);
        let Some(timer) = timer.as_mut() else {
            return;
        };
        timer.clear_interrupt();

        let Some(next) = PULSE.borrow_ref_mut(cs).as_mut().map(|pulse| pulse.fire()) else {
            return;
        };
        if let Err(e) = timer.schedule(to_duration(next)) {
            error!("Dust pulse re-arm failed: {:?}", e);
        }
    });
}

#[handler(priority = Priority::Priority1)]
fn report_tick() {
    critical_section::with(|cs| {
        if let Some(timer) = REPORT_TIMER.borrow_ref_mut(cs).as_mut() {
            timer.clear_interrupt();
        }
    });
    SCHEDULER.on_tick();
}

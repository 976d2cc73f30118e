//! Desktop simulator for the envmon gas/dust/climate monitor.
//!
//! Runs the real envmon-core acquisition path against synthetic sensors:
//!
//! - a background thread steps the dust pulse machine, sleeping for whatever
//!   delay it returns, in place of the one-shot timer interrupt
//! - a second thread ticks the report scheduler once per period, in place of
//!   the periodic timer interrupt
//! - the main thread polls the due flag and prints the serial report
//!
//! The dust sensor model only produces its dust signal while the LED is on,
//! so the printed density shows whether the pulse timing is right.
//!
//! With the `window` feature the display panel is rendered in an SDL2 window
//! via `embedded-graphics-simulator`. Set `RUST_LOG=info` to see the logs.

use std::convert::Infallible;
use std::io::Write as _;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType as I2cErrorType, I2c, Operation};
use log::{error, info};

use envmon_core::sensors::{DHT12_ADDRESS, Dht12};
use envmon_core::{
    Acquisition, AnalogSampler, Channel, DustPulse, DustSlot, MonitorConfig, RawSample,
    ReadingSink, ReportScheduler, SerialSink, SharedConverter,
};

// ---------------------------------------------------------------------------
// Shared state (statics on the board, statics here too)
// ---------------------------------------------------------------------------

static CONVERTER: SharedConverter<MockSampler> = SharedConverter::new();
static DUST_SLOT: DustSlot = DustSlot::new();
static SCHEDULER: ReportScheduler = ReportScheduler::new();

/// Level the dust LED pin is currently driven to.
static LED_HIGH: AtomicBool = AtomicBool::new(true);

/// Every n-th climate read fails, to exercise the stale path.
const CLIMATE_FAILURE_EVERY: u32 = 7;

/// Gas divider voltage above which the comparator asserts the alert.
const ALERT_VOLTS: f32 = 3.0;

// ---------------------------------------------------------------------------
// Mock data generation
// ---------------------------------------------------------------------------

fn elapsed_secs() -> f64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_secs_f64()
}

/// Gas divider voltage: clean air baseline with a slow pollution swell.
fn gas_volts(t: f64) -> f32 {
    (0.9 + 1.4 * (t / 40.0).sin().max(0.0) + 0.05 * (t / 3.0).cos()) as f32
}

/// Dust sensor output while the LED is lit.
fn dust_volts(t: f64) -> f32 {
    (0.35 + 0.2 * (t / 25.0).sin()) as f32
}

fn volts_to_raw(config: &MonitorConfig, volts: f32) -> RawSample {
    let scale = config.adc;
    let raw = (volts / scale.reference_volts * scale.max as f32).round();
    RawSample(raw.clamp(0.0, scale.max as f32) as u16)
}

/// Converter model. The dust channel reads the LED-off dark level unless the
/// LED is lit, so a mistimed sample shows up as zero dust.
struct MockSampler {
    config: MonitorConfig,
    polarity_active_low: bool,
}

impl AnalogSampler for MockSampler {
    fn sample(&mut self, channel: Channel) -> RawSample {
        let t = elapsed_secs();
        match channel {
            Channel::Gas => volts_to_raw(&self.config, gas_volts(t)),
            Channel::Dust => {
                let lit = LED_HIGH.load(Ordering::Acquire) != self.polarity_active_low;
                let volts = if lit { dust_volts(t) } else { 0.05 };
                volts_to_raw(&self.config, volts)
            }
        }
    }
}

struct MockLed;

impl PinErrorType for MockLed {
    type Error = Infallible;
}

impl OutputPin for MockLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        LED_HIGH.store(false, Ordering::Release);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        LED_HIGH.store(true, Ordering::Release);
        Ok(())
    }
}

/// Open-collector comparator output: low while the gas level is high.
struct MockAlert;

impl PinErrorType for MockAlert {
    type Error = Infallible;
}

impl InputPin for MockAlert {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(gas_volts(elapsed_secs()) < ALERT_VOLTS)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// DHT12 register model on a fake I2C bus.
struct MockClimateBus {
    reads: AtomicU32,
}

impl MockClimateBus {
    fn new() -> Self {
        Self {
            reads: AtomicU32::new(0),
        }
    }

    /// Register block `(hum_int, hum_dec, temp_int, temp_dec)` for the current
    /// synthetic climate.
    fn registers(t: f64) -> [u8; 4] {
        let temperature = 23.0 + 3.0 * (t / 120.0).sin();
        let humidity = 50.0 + 10.0 * (t / 180.0).sin();
        let encode = |value: f64| {
            let tenths = (value.abs() * 10.0).round() as u32;
            ((tenths / 10) as u8, (tenths % 10) as u8)
        };
        let (hum_int, hum_dec) = encode(humidity);
        let (temp_int, mut temp_dec) = encode(temperature);
        if temperature < 0.0 {
            temp_dec |= 0x80;
        }
        [hum_int, hum_dec, temp_int, temp_dec]
    }
}

impl I2cErrorType for MockClimateBus {
    type Error = ErrorKind;
}

impl I2c for MockClimateBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != DHT12_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ));
        }
        let n = self.reads.fetch_add(1, Ordering::Relaxed) + 1;
        if n % CLIMATE_FAILURE_EVERY == 0 {
            return Err(ErrorKind::Bus);
        }

        let registers = Self::registers(elapsed_secs());
        for op in operations {
            if let Operation::Read(buffer) = op {
                let len = buffer.len().min(registers.len());
                buffer[..len].copy_from_slice(&registers[..len]);
            }
        }
        Ok(())
    }
}

/// Serial port stand-in: forwards report lines to stdout.
struct Stdout;

impl core::fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let mut out = std::io::stdout().lock();
        out.write_all(s.as_bytes()).map_err(|_| core::fmt::Error)?;
        out.flush().map_err(|_| core::fmt::Error)
    }
}

// ---------------------------------------------------------------------------
// Timer stand-ins
// ---------------------------------------------------------------------------

fn spawn_dust_pulse(config: MonitorConfig) {
    let mut pulse = DustPulse::new(
        MockLed,
        config.led_polarity,
        config.pulse,
        &CONVERTER,
        &DUST_SLOT,
    );
    let first = pulse.initial_delay();

    thread::spawn(move || {
        thread::sleep(Duration::from_micros(first.ticks() as u64));
        loop {
            let next = pulse.fire();
            thread::sleep(Duration::from_micros(next.ticks() as u64));
        }
    });
}

fn spawn_report_timer(config: MonitorConfig) {
    let period = Duration::from_millis(config.report_period.ticks() as u64);
    thread::spawn(move || {
        loop {
            thread::sleep(period);
            SCHEDULER.on_tick();
        }
    });
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

#[cfg(feature = "window")]
mod window {
    use embedded_graphics::pixelcolor::Rgb565;
    use embedded_graphics::prelude::*;
    use embedded_graphics_simulator::{
        OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window,
    };
    use envmon_core::{DisplaySink, EnvironmentReading, ReadingSink};

    /// Pixel scale factor for the simulator window.
    const WINDOW_SCALE: u32 = 2;

    pub struct Panel {
        sink: DisplaySink<SimulatorDisplay<Rgb565>>,
        window: Window,
    }

    impl Panel {
        pub fn open() -> Self {
            let display = SimulatorDisplay::<Rgb565>::new(Size::new(320, 240));
            let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).build();
            let mut window = Window::new("envmon Simulator", &output_settings);
            let sink = match DisplaySink::new(display) {
                Ok(sink) => sink,
                Err(e) => match e {},
            };
            // The SDL window is lazily initialized on the first `update()` call.
            window.update(sink.display());
            Self { sink, window }
        }

        pub fn present(&mut self, reading: &EnvironmentReading) {
            if let Err(e) = self.sink.present(reading) {
                match e {}
            }
        }

        /// Pump window events. Returns `false` once the window was closed.
        pub fn update(&mut self) -> bool {
            self.window.update(self.sink.display());
            !self
                .window
                .events()
                .any(|event| matches!(event, SimulatorEvent::Quit))
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting envmon simulator");

    let config = MonitorConfig::DEFAULT;
    CONVERTER.install(MockSampler {
        config,
        polarity_active_low: matches!(
            config.led_polarity,
            envmon_core::dust::LedPolarity::ActiveLow
        ),
    });

    let climate = Dht12::new(MockClimateBus::new(), config.climate_address);
    let mut acquisition = Acquisition::new(
        climate,
        MockAlert,
        &CONVERTER,
        &DUST_SLOT,
        &SCHEDULER,
        config,
    );
    let mut serial = SerialSink::new(Stdout);

    #[cfg(feature = "window")]
    let mut panel = window::Panel::open();

    spawn_dust_pulse(config);
    spawn_report_timer(config);

    loop {
        if let Some(reading) = acquisition.poll() {
            if let Err(e) = serial.present(&reading) {
                error!("Serial report failed: {}", e);
            }
            #[cfg(feature = "window")]
            panel.present(&reading);
        }

        #[cfg(feature = "window")]
        if !panel.update() {
            break;
        }

        thread::sleep(Duration::from_millis(10));
    }

    #[cfg(feature = "window")]
    info!("Simulator exiting");
}

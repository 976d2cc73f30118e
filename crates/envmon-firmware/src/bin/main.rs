#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use esp_hal::timer::{OneShotTimer, PeriodicTimer};
use esp_hal::uart::{Config as UartConfig, Uart};
use log::{error, info, warn};
use rtt_target::rprintln;

// Display-LCD panel specific imports
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use mipidsi::interface::SpiInterface;
use mipidsi::{Builder as MipidsiBuilder, models::ILI9342CRgb565};

use envmon_core::sensors::Dht12;
use envmon_core::{Acquisition, DisplaySink, DustPulse, ReadingSink, SerialSink};
use envmon_firmware::board::{self, BoardSampler};
use envmon_firmware::interrupts::{self, CONVERTER, DUST_SLOT, SCHEDULER};

const DISPLAY_WIDTH: u16 = 320;
const DISPLAY_HEIGHT: u16 = 240;

#[cfg(feature = "calibrate-on-boot")]
const CALIBRATION_SAMPLES: u32 = 30;
#[cfg(feature = "calibrate-on-boot")]
const CALIBRATION_INTERVAL_MS: u32 = 1_000;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_hal::main]
fn main() -> ! {
    rtt_target::rtt_init_log!(log::LevelFilter::Info);

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);
    let mut delay = Delay::new();

    let config = board::monitor_config();
    info!("envmon starting, R0 = {} ohm", config.gas.r_zero);

    // Serial report output
    let uart = Uart::new(
        peripherals.UART0,
        UartConfig::default().with_baudrate(board::SERIAL_BAUD),
    )
    .expect("Failed to initialize UART0")
    .with_tx(peripherals.GPIO43)
    .with_rx(peripherals.GPIO44);
    let mut serial = SerialSink::new(uart);

    // Shared converter: ADC1 with both sensor channels
    let mut adc_config = AdcConfig::new();
    let gas_pin = adc_config.enable_pin(peripherals.GPIO1, Attenuation::_11dB);
    let dust_pin = adc_config.enable_pin(peripherals.GPIO2, Attenuation::_11dB);
    let adc = Adc::new(peripherals.ADC1, adc_config);
    CONVERTER.install(BoardSampler::new(adc, gas_pin, dust_pin));

    // Climate sensor and gas alert input
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(100)),
    )
    .expect("Failed to initialize I2C0")
    .with_sda(peripherals.GPIO8)
    .with_scl(peripherals.GPIO9);
    let climate = Dht12::new(i2c, config.climate_address);
    let alert = Input::new(
        peripherals.GPIO6,
        InputConfig::default().with_pull(Pull::Up),
    );

    // Configure and initialize the display

    // 1. Configure SPI bus
    let spi_bus = Spi::new(peripherals.SPI2, SpiConfig::default())
        .expect("Failed to initialize SPI2")
        .with_sck(peripherals.GPIO36)
        .with_mosi(peripherals.GPIO37);

    // 2. Create a dummy CS pin (we don't use hardware CS for this display)
    let cs = Output::new(peripherals.GPIO35, Level::High, OutputConfig::default());

    // 3. Wrap the SPI bus as a SPI device (required by embedded-hal traits)
    let spi_device =
        ExclusiveDevice::new_no_delay(spi_bus, cs).expect("Failed to create SPI device");

    // 4. Set up DC (Data/Command) pin
    let dc = Output::new(peripherals.GPIO34, Level::Low, OutputConfig::default());

    // 5. Create a buffer for SPI batching (larger = faster, uses more RAM)
    let mut spi_buffer = [0u8; 64];

    // 6. Create display interface
    let di = SpiInterface::new(spi_device, dc, &mut spi_buffer);

    // 7. Build and initialize the display driver. The monitor keeps running
    // on serial output alone if the panel does not come up.
    let mut panel = match MipidsiBuilder::new(ILI9342CRgb565, di)
        .display_size(DISPLAY_WIDTH, DISPLAY_HEIGHT)
        .init(&mut delay)
    {
        Ok(display) => match DisplaySink::new(display) {
            Ok(sink) => Some(sink),
            Err(e) => {
                warn!("Display clear failed: {:?}", e);
                None
            }
        },
        Err(e) => {
            warn!("Display init failed: {:?}", e);
            None
        }
    };

    let mut acquisition = Acquisition::new(
        climate,
        alert,
        &CONVERTER,
        &DUST_SLOT,
        &SCHEDULER,
        config,
    );

    #[cfg(feature = "calibrate-on-boot")]
    match acquisition.calibrate_baseline(CALIBRATION_SAMPLES, CALIBRATION_INTERVAL_MS, &mut delay)
    {
        Ok(r_zero) => info!("Gas baseline calibrated: R0 = {} ohm", r_zero),
        Err(e) => warn!("Gas baseline calibration failed ({}), keeping R0", e),
    }

    // Dust LED starts off; with the usual PNP wiring that is a high level
    let led = Output::new(peripherals.GPIO5, Level::High, OutputConfig::default());
    let pulse = DustPulse::new(
        led,
        config.led_polarity,
        config.pulse,
        &CONVERTER,
        &DUST_SLOT,
    );

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let timg1 = TimerGroup::new(peripherals.TIMG1);
    interrupts::start_dust_pulse(pulse, OneShotTimer::new(timg1.timer0));
    interrupts::start_report_timer(PeriodicTimer::new(timg0.timer0), config.report_period);

    rprintln!("Monitor running");

    loop {
        let Some(reading) = acquisition.poll() else {
            core::hint::spin_loop();
            continue;
        };

        if let Err(e) = serial.present(&reading) {
            error!("Serial report failed: {}", e);
        }
        if let Some(panel) = panel.as_mut() {
            if let Err(e) = panel.present(&reading) {
                error!("Display update failed: {:?}", e);
            }
        }
    }
}

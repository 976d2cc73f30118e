//! Board wiring and the ADC adapter
//!
//! | Signal          | Pin     |
//! |-----------------|---------|
//! | MQ135 divider   | GPIO1 (ADC1 ch0) |
//! | GP2Y1010 Vo     | GPIO2 (ADC1 ch1) |
//! | GP2Y1010 LED    | GPIO5, active low |
//! | Gas alert (DO)  | GPIO6, active low |
//! | DHT12 SDA/SCL   | GPIO8 / GPIO9 |
//! | UART0 TX/RX     | GPIO43 / GPIO44 |

use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcPin};
use esp_hal::peripherals::{ADC1, GPIO1, GPIO2};
use log::error;

use envmon_core::{AdcScale, AnalogSampler, Channel, MonitorConfig, RawSample};

/// ADC1 is 12 bit; with 11 dB attenuation full scale sits near 3.1 V.
pub const ADC_SCALE: AdcScale = AdcScale {
    max: 4095,
    reference_volts: 3.1,
};

/// The MQ135 load resistor is tied to the 3V3 rail so the divider stays
/// inside the ADC range.
pub const GAS_SUPPLY_VOLTS: f32 = 3.3;

pub const SERIAL_BAUD: u32 = 115_200;

pub type GasPin = AdcPin<GPIO1<'static>, ADC1<'static>>;
pub type DustPin = AdcPin<GPIO2<'static>, ADC1<'static>>;

/// Monitor configuration for this board, with the build-time R0 override
/// applied when present.
pub fn monitor_config() -> MonitorConfig {
    let mut config = MonitorConfig {
        adc: ADC_SCALE,
        gas_supply_volts: GAS_SUPPLY_VOLTS,
        ..MonitorConfig::DEFAULT
    };
    if let Some(r_zero) = crate::r_zero_override() {
        config.gas = config.gas.with_r_zero(r_zero);
    }
    config
}

/// ADC1 with both sensor inputs enabled.
///
/// Owned by the core's `SharedConverter`; the gas and dust pins are never
/// converted concurrently.
pub struct BoardSampler {
    adc: Adc<'static, ADC1<'static>, Blocking>,
    gas: GasPin,
    dust: DustPin,
}

impl BoardSampler {
    pub fn new(adc: Adc<'static, ADC1<'static>, Blocking>, gas: GasPin, dust: DustPin) -> Self {
        Self { adc, gas, dust }
    }
}

impl AnalogSampler for BoardSampler {
    fn sample(&mut self, channel: Channel) -> RawSample {
        // One-shot conversions poll until the SAR finishes
        let result = match channel {
            Channel::Gas => nb::block!(self.adc.read_oneshot(&mut self.gas)),
            Channel::Dust => nb::block!(self.adc.read_oneshot(&mut self.dust)),
        };
        match result {
            Ok(raw) => RawSample(raw),
            Err(()) => {
                error!("ADC conversion on {} channel failed", channel.label());
                RawSample(0)
            }
        }
    }
}

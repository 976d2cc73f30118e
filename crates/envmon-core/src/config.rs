//! Startup configuration
//!
//! All values are fixed at build or init time. Nothing here changes while the
//! timers are running.

use fugit::MillisDurationU32;

use crate::analog::AdcScale;
use crate::dust::{DustCalibration, LedPolarity, PulseTiming};
use crate::gas::GasCalibration;
use crate::sensors::DHT12_ADDRESS;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Converter full scale and reference
    pub adc: AdcScale,
    /// Supply across the gas sensor and its load resistor (V)
    pub gas_supply_volts: f32,
    pub gas: GasCalibration,
    pub dust: DustCalibration,
    pub pulse: PulseTiming,
    pub led_polarity: LedPolarity,
    /// Bus address of the climate sensor
    pub climate_address: u8,
    /// Report timer period
    pub report_period: MillisDurationU32,
}

impl MonitorConfig {
    /// 10-bit converter referenced to a 5 V supply, the reference board.
    pub const DEFAULT: Self = Self {
        adc: AdcScale::TEN_BIT_5V,
        gas_supply_volts: 5.0,
        gas: GasCalibration::DEFAULT,
        dust: DustCalibration::GP2Y1010,
        pulse: PulseTiming::GP2Y1010,
        led_polarity: LedPolarity::ActiveLow,
        climate_address: DHT12_ADDRESS,
        report_period: MillisDurationU32::from_ticks(1_000),
    };
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

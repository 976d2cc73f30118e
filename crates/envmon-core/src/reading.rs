//! Result of one reporting cycle

/// Everything measured and computed in one reporting cycle.
///
/// Built fresh by the acquisition loop, handed to the sinks, then dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentReading {
    /// Ambient temperature (°C)
    pub temperature_c: f32,
    /// Relative humidity (%)
    pub humidity_pct: f32,
    /// `true` when the climate sensor failed this cycle and the values above
    /// were carried over from an earlier one
    pub climate_stale: bool,

    /// Voltage across the gas sensor load resistor (V)
    pub gas_volts: f32,
    /// Gas sensor resistance (Ω)
    pub gas_resistance_ohm: f32,
    /// CO2 estimate without climate correction (ppm)
    pub gas_ppm: f32,
    /// CO2 estimate corrected for temperature and humidity (ppm)
    pub gas_ppm_corrected: f32,
    /// R0 the estimate was computed against (Ω)
    pub r_zero_ohm: f32,

    /// Dust sensor output voltage (V)
    pub dust_volts: f32,
    /// Dust density (µg/m³)
    pub dust_ug_m3: f32,

    /// Gas threshold comparator output
    pub alert: bool,
}

impl EnvironmentReading {
    /// Rs/R0, the input of the concentration power law.
    pub fn resistance_ratio(&self) -> f32 {
        self.gas_resistance_ohm / self.r_zero_ohm
    }
}

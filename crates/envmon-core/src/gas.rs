//! MQ135 gas sensor calibration
//!
//! The sensor is a metal-oxide resistor in series with a load resistor. The
//! converter sees the voltage across the load, from which the sensor
//! resistance `Rs` follows. Concentration is a power-law fit of `Rs / R0`, where
//! `R0` is the resistance measured at the known atmospheric CO2 level.
//!
//! Every function here is pure. Invalid inputs never produce a misleading
//! finite number: a zero output voltage gives an infinite resistance and a
//! non-positive resistance gives NaN.

use libm::powf;
use log::{info, warn};
use thiserror_no_std::Error;

/// Calibration constants for the gas sensor.
///
/// Set once at startup, or by [`BaselineCalibrator`], and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasCalibration {
    /// Load resistance on the board (Ω)
    pub load_resistance: f32,
    /// Sensor resistance at atmospheric CO2 (Ω)
    pub r_zero: f32,
    /// Power-law scale: ppm at `Rs == R0`
    pub para: f32,
    /// Power-law exponent
    pub parb: f32,
    /// Temperature/humidity correction coefficients
    pub cora: f32,
    pub corb: f32,
    pub corc: f32,
    pub cord: f32,
    /// Atmospheric CO2 used as the calibration reference (ppm)
    pub atmospheric_ppm: f32,
}

impl GasCalibration {
    pub const DEFAULT: Self = Self {
        load_resistance: 20_000.0,
        r_zero: 28_000.0,
        para: 400.0,
        parb: 2.769034857,
        cora: 0.00035,
        corb: 0.02718,
        corc: 1.39538,
        cord: 0.0018,
        atmospheric_ppm: 397.13,
    };

    pub const fn with_r_zero(self, r_zero: f32) -> Self {
        Self { r_zero, ..self }
    }

    /// Sensor resistance from the divider voltage: `Rload * (vcc / v_out - 1)`.
    ///
    /// A reading of 0 V (saturated low) yields `f32::INFINITY`.
    pub fn resistance_from_voltage(&self, vcc: f32, v_out: f32) -> f32 {
        if v_out <= 0.0 {
            return f32::INFINITY;
        }
        self.load_resistance * (vcc / v_out - 1.0)
    }

    /// Empirical correction for ambient temperature (°C) and humidity (%).
    pub fn correction_factor(&self, t: f32, h: f32) -> f32 {
        self.cora * t * t - self.corb * t + self.corc - (h - 33.0) * self.cord
    }

    /// Resistance normalised to the reference climate.
    pub fn corrected_resistance(&self, t: f32, h: f32, rs: f32) -> f32 {
        let factor = self.correction_factor(t, h);
        if rs.is_nan() || rs <= 0.0 || factor.is_nan() || factor <= 0.0 {
            return f32::NAN;
        }
        rs / factor
    }

    /// CO2 concentration assuming CO2 is the only gas present.
    pub fn concentration_ppm(&self, rs: f32) -> f32 {
        if rs.is_nan() || rs <= 0.0 {
            return f32::NAN;
        }
        self.para * powf(rs / self.r_zero, -self.parb)
    }

    /// [`Self::concentration_ppm`] after temperature/humidity correction.
    pub fn corrected_concentration_ppm(&self, t: f32, h: f32, rs: f32) -> f32 {
        self.concentration_ppm(self.corrected_resistance(t, h, rs))
    }

    /// R0 implied by a resistance measured in clean air.
    pub fn baseline_resistance(&self, rs: f32) -> f32 {
        rs * powf(self.atmospheric_ppm / self.para, 1.0 / self.parb)
    }

    pub fn corrected_baseline_resistance(&self, t: f32, h: f32, rs: f32) -> f32 {
        self.baseline_resistance(self.corrected_resistance(t, h, rs))
    }
}

impl Default for GasCalibration {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationError {
    #[error("no calibration samples were collected")]
    NoSamples,
    #[error("all {0} calibration samples gave an unusable baseline")]
    NoUsableSamples(u32),
}

/// Averages clean-air baseline resistances into a new R0.
///
/// Samples whose corrected baseline is not a finite positive number (rail
/// readings, nonsense climate values) are counted but left out of the mean.
#[derive(Debug, Clone, Copy, Default)]
pub struct BaselineCalibrator {
    sum: f32,
    used: u32,
    seen: u32,
}

impl BaselineCalibrator {
    pub const fn new() -> Self {
        Self {
            sum: 0.0,
            used: 0,
            seen: 0,
        }
    }

    pub fn add(&mut self, calibration: &GasCalibration, t: f32, h: f32, rs: f32) {
        self.seen += 1;
        let r_zero = calibration.corrected_baseline_resistance(t, h, rs);
        if r_zero.is_finite() && r_zero > 0.0 {
            self.sum += r_zero;
            self.used += 1;
        } else {
            warn!("Discarding calibration sample: Rs={} gives R0={}", rs, r_zero);
        }
    }

    pub const fn samples_seen(&self) -> u32 {
        self.seen
    }

    /// Mean R0 over the usable samples.
    pub fn finish(&self) -> Result<f32, CalibrationError> {
        if self.seen == 0 {
            return Err(CalibrationError::NoSamples);
        }
        if self.used == 0 {
            return Err(CalibrationError::NoUsableSamples(self.seen));
        }
        let r_zero = self.sum / self.used as f32;
        info!(
            "Baseline calibration: R0={} from {}/{} samples",
            r_zero, self.used, self.seen
        );
        Ok(r_zero)
    }
}

//! Quality assessment for readings
//!
//! This module provides quality level assessment and thresholds for
//! determining environmental quality based on the computed readings.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::WebColors;

/// Quantities that get a quality rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Temperature,
    Humidity,
    Co2,
    Dust,
}

/// Quality level assessment for a reading
///
/// Provides standardized quality ratings based on fixed thresholds.
/// Used by the display to color each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityLevel {
    /// Optimal conditions
    Excellent,
    /// Acceptable conditions
    Good,
    /// Sub-optimal conditions
    Poor,
    /// Problematic conditions, or a value that is not a number
    Bad,
}

impl QualityLevel {
    /// Assess quality level for a given value
    ///
    /// Values are in the unit of the metric: °C, %, ppm, µg/m³.
    pub fn assess(metric: Metric, value: f32) -> Self {
        if value.is_nan() {
            return Self::Bad;
        }
        match metric {
            Metric::Temperature => {
                // Excellent: 20-24°C, Good: 18-26°C, Poor: 15-28°C
                if (20.0..=24.0).contains(&value) {
                    Self::Excellent
                } else if (18.0..=26.0).contains(&value) {
                    Self::Good
                } else if (15.0..=28.0).contains(&value) {
                    Self::Poor
                } else {
                    Self::Bad
                }
            }
            Metric::Humidity => {
                // Excellent: 40-60%, Good: 30-70%, Poor: 20-80%
                if (40.0..=60.0).contains(&value) {
                    Self::Excellent
                } else if (30.0..=70.0).contains(&value) {
                    Self::Good
                } else if (20.0..=80.0).contains(&value) {
                    Self::Poor
                } else {
                    Self::Bad
                }
            }
            Metric::Co2 => Self::upper_bound(value, 600.0, 1000.0, 1500.0),
            // 24 h PM2.5 guideline bands
            Metric::Dust => Self::upper_bound(value, 12.0, 35.0, 55.0),
        }
    }

    fn upper_bound(value: f32, excellent: f32, good: f32, poor: f32) -> Self {
        if value <= excellent {
            Self::Excellent
        } else if value <= good {
            Self::Good
        } else if value <= poor {
            Self::Poor
        } else {
            Self::Bad
        }
    }

    /// Get the display color for this quality level
    pub const fn color(self) -> Rgb565 {
        match self {
            Self::Excellent => Rgb565::CSS_GREEN,
            Self::Good => Rgb565::CSS_LIGHT_GREEN,
            Self::Poor => Rgb565::CSS_ORANGE,
            Self::Bad => Rgb565::CSS_RED,
        }
    }

    /// Get the display label for this quality level
    pub const fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Poor => "Poor",
            Self::Bad => "Bad",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_co2_bands() {
        assert_eq!(QualityLevel::assess(Metric::Co2, 420.0), QualityLevel::Excellent);
        assert_eq!(QualityLevel::assess(Metric::Co2, 900.0), QualityLevel::Good);
        assert_eq!(QualityLevel::assess(Metric::Co2, 1200.0), QualityLevel::Poor);
        assert_eq!(QualityLevel::assess(Metric::Co2, 5000.0), QualityLevel::Bad);
    }

    #[test]
    fn test_dust_bands() {
        assert_eq!(QualityLevel::assess(Metric::Dust, 0.0), QualityLevel::Excellent);
        assert_eq!(QualityLevel::assess(Metric::Dust, 68.7), QualityLevel::Bad);
    }

    #[test]
    fn test_nan_is_bad() {
        assert_eq!(QualityLevel::assess(Metric::Co2, f32::NAN), QualityLevel::Bad);
        assert_eq!(
            QualityLevel::assess(Metric::Temperature, f32::NAN),
            QualityLevel::Bad
        );
    }

    #[test]
    fn test_comfort_ranges() {
        assert_eq!(
            QualityLevel::assess(Metric::Temperature, 22.0),
            QualityLevel::Excellent
        );
        assert_eq!(QualityLevel::assess(Metric::Humidity, 75.0), QualityLevel::Poor);
    }
}

//! ESP32-S3 firmware-specific modules for envmon
//!
//! This crate contains the hardware half of the monitor: the ADC adapter that
//! backs the core's shared converter, and the two timer interrupts that drive
//! the dust LED pulse and the report cadence.

#![no_std]

pub mod board;
pub mod interrupts;

/// Gas baseline baked in at build time through `ENVMON_R_ZERO`, if any.
pub fn r_zero_override() -> Option<f32> {
    option_env!("ENVMON_R_ZERO").and_then(|value| value.trim().parse().ok())
}

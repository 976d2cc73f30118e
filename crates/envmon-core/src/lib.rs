//! Hardware-independent core library for envmon
//!
//! This crate contains the platform-agnostic half of the envmon gas/dust/climate
//! monitor: the shared analog converter, the dust LED pulse state machine, the
//! report scheduler, the gas calibration math, the acquisition orchestrator and
//! the presentation sinks.
//!
//! It is `#![no_std]` so it compiles on both embedded targets (ESP32-S3) and
//! desktop hosts (for the simulator and tests). Everything that touches a real
//! peripheral goes through an `embedded-hal` trait or [`analog::AnalogSampler`].

#![no_std]

pub mod acquisition;
pub mod analog;
pub mod config;
pub mod dust;
pub mod gas;
pub mod metrics;
pub mod reading;
pub mod report;
pub mod sensors;
pub mod sinks;

#[cfg(test)]
mod testing;

pub use acquisition::Acquisition;
pub use analog::{AdcScale, AnalogSampler, Channel, RawSample, SharedConverter};
pub use config::MonitorConfig;
pub use dust::{DustCalibration, DustPulse, DustSlot, PulsePhase, PulseTiming};
pub use gas::{BaselineCalibrator, GasCalibration};
pub use metrics::{Metric, QualityLevel};
pub use reading::EnvironmentReading;
pub use report::{DueFlag, ReportScheduler};
pub use sinks::{DisplaySink, ReadingSink, SerialSink};

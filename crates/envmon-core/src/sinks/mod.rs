//! Presentation sinks
//!
//! A sink consumes a finished [`EnvironmentReading`] and presents it: a text
//! line stream over the serial port, or a panel on the display. Sinks never
//! feed anything back into acquisition.

mod display;
mod serial;

pub use display::*;
pub use serial::*;

use crate::reading::EnvironmentReading;

/// Consumer of one reading per reporting cycle.
pub trait ReadingSink {
    type Error: core::fmt::Debug;

    fn present(&mut self, reading: &EnvironmentReading) -> Result<(), Self::Error>;
}

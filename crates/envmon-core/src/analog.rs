//! Single shared analog-to-digital converter
//!
//! The board has one converter and two users: the dust pulse interrupt and the
//! main acquisition loop. A conversion started while another one is in flight
//! corrupts both results, so the converter lives inside a [`SharedConverter`]
//! and every access is a scoped acquisition inside a critical section.
//!
//! Inside that critical section interrupts are masked. When the main loop is
//! converting the gas channel the fast pulse interrupt is held off until the
//! conversion returns, and fires (late by at most one conversion time) right
//! after the guard is released.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use thiserror_no_std::Error;

/// Physical inputs multiplexed onto the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// MQ135 load-resistor divider
    Gas,
    /// GP2Y1010 analog output
    Dust,
}

impl Channel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gas => "gas",
            Self::Dust => "dust",
        }
    }
}

/// One raw conversion result in `[0, AdcScale::max]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RawSample(pub u16);

impl RawSample {
    pub const fn value(self) -> u16 {
        self.0
    }

    /// True when the sample sits on either rail, i.e. the input is saturated.
    pub const fn is_at_rail(self, scale: &AdcScale) -> bool {
        self.0 == 0 || self.0 >= scale.max
    }
}

/// Counts-to-volts mapping of the converter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcScale {
    /// Full-scale count (1023 for 10 bit, 4095 for 12 bit)
    pub max: u16,
    /// Voltage corresponding to `max`
    pub reference_volts: f32,
}

impl AdcScale {
    pub const TEN_BIT_5V: Self = Self {
        max: 1023,
        reference_volts: 5.0,
    };

    pub fn to_volts(&self, sample: RawSample) -> f32 {
        self.reference_volts * sample.0 as f32 / self.max as f32
    }
}

/// Blocking "convert channel N now" primitive provided by the board.
///
/// Implementations select the requested channel, start a conversion and
/// busy-wait for completion. The wait is bounded by the hardware conversion
/// time (tens of microseconds), far below either timer period. The channel
/// register is written on every call, so no caller depends on what the
/// previous caller left selected.
pub trait AnalogSampler {
    fn sample(&mut self, channel: Channel) -> RawSample;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterError {
    #[error("analog converter has not been installed")]
    NotInstalled,
    #[error("analog converter is already borrowed")]
    Busy,
}

/// Exclusively owned converter, shareable between interrupt and main context.
///
/// Intended to live in a `static`:
///
/// ```rust,ignore
/// static CONVERTER: SharedConverter<BoardSampler> = SharedConverter::new();
///
/// CONVERTER.install(BoardSampler::new(adc, gas_pin, dust_pin));
/// let raw = CONVERTER.sample(Channel::Gas)?;
/// ```
pub struct SharedConverter<S> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Option<S>>>,
}

impl<S> SharedConverter<S> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Hand the converter over. Returns the previously installed one, if any.
    pub fn install(&self, sampler: S) -> Option<S> {
        self.inner.lock(|cell| cell.borrow_mut().replace(sampler))
    }

    /// Take the converter back out, leaving the slot empty.
    pub fn take(&self) -> Option<S> {
        self.inner.lock(|cell| cell.borrow_mut().take())
    }

    pub fn is_installed(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().is_some())
    }

    /// Run `f` with exclusive access to the converter.
    ///
    /// The critical section is entered before `f` runs and left after it
    /// returns, on every path.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> Result<R, ConverterError> {
        self.inner.lock(|cell| {
            let mut guard = cell.try_borrow_mut().map_err(|_| ConverterError::Busy)?;
            let sampler = guard.as_mut().ok_or(ConverterError::NotInstalled)?;
            Ok(f(sampler))
        })
    }
}

impl<S: AnalogSampler> SharedConverter<S> {
    /// Convert one channel while holding the converter exclusively.
    pub fn sample(&self, channel: Channel) -> Result<RawSample, ConverterError> {
        self.with(|sampler| sampler.sample(channel))
    }
}

impl<S> Default for SharedConverter<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedSampler;

    #[test]
    fn test_sample_before_install_fails() {
        let converter: SharedConverter<FixedSampler> = SharedConverter::new();
        assert_eq!(
            converter.sample(Channel::Gas),
            Err(ConverterError::NotInstalled)
        );
    }

    #[test]
    fn test_sample_routes_channel() {
        let converter = SharedConverter::new();
        converter.install(FixedSampler::new(512, 102));

        assert_eq!(converter.sample(Channel::Gas), Ok(RawSample(512)));
        assert_eq!(converter.sample(Channel::Dust), Ok(RawSample(102)));

        let sampler = converter.take().unwrap();
        assert_eq!(sampler.conversions.as_slice(), &[Channel::Gas, Channel::Dust]);
        assert!(!converter.is_installed());
    }

    #[test]
    fn test_nested_access_reports_busy() {
        let converter = SharedConverter::new();
        converter.install(FixedSampler::new(1, 2));

        let inner = converter.with(|_| converter.sample(Channel::Dust)).unwrap();
        assert_eq!(inner, Err(ConverterError::Busy));
    }

    #[test]
    fn test_to_volts() {
        let scale = AdcScale::TEN_BIT_5V;
        assert_eq!(scale.to_volts(RawSample(0)), 0.0);
        assert_eq!(scale.to_volts(RawSample(1023)), 5.0);
        assert!((scale.to_volts(RawSample(102)) - 0.4985).abs() < 1e-4);
    }

    #[test]
    fn test_rail_detection() {
        let scale = AdcScale::TEN_BIT_5V;
        assert!(RawSample(0).is_at_rail(&scale));
        assert!(RawSample(1023).is_at_rail(&scale));
        assert!(!RawSample(511).is_at_rail(&scale));
    }
}

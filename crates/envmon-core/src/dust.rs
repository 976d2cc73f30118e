//! GP2Y1010 optical dust sensor: LED pulse state machine and conversion
//!
//! The sensor needs its infrared LED pulsed once per 10 ms cycle, and its output
//! sampled 280 µs after the LED comes on. [`DustPulse`] is driven entirely from
//! the fast one-shot timer interrupt: each firing performs one step and returns
//! the delay the timer must be re-armed with.
//!
//! ```text
//!   fire #1 (LedOn)   fire #2 (Sample)                 fire #3 (LedOn)
//!   |-- settle 280 µs --|------------ rest 9720 µs ------------|
//!   LED on              sample, LED off                        LED on
//! ```
//!
//! The result is published through [`DustSlot`], read by the main loop.

use core::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use embedded_hal::digital::OutputPin;
use fugit::MicrosDurationU32;
use log::error;

use crate::analog::{AnalogSampler, Channel, RawSample, SharedConverter};

/// Latest raw dust sample, handed from the pulse interrupt to the main loop.
///
/// Single writer (pulse interrupt), single reader (main loop). The sample is a
/// `u16`, stored with one atomic access, so the reader never sees a torn
/// value. The generation counter advances once per stored sample.
pub struct DustSlot {
    raw: AtomicU16,
    generation: AtomicU32,
}

impl DustSlot {
    pub const fn new() -> Self {
        Self {
            raw: AtomicU16::new(0),
            generation: AtomicU32::new(0),
        }
    }

    /// Only called from the pulse interrupt.
    pub fn store(&self, sample: RawSample) {
        self.raw.store(sample.0, Ordering::Release);
        self.generation.fetch_add(1, Ordering::Release);
    }

    pub fn latest(&self) -> RawSample {
        RawSample(self.raw.load(Ordering::Acquire))
    }

    /// Number of samples stored so far. Zero means the slot still holds its
    /// initial value.
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for DustSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// LED settle interval and full cycle length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    /// LED on until the sample is taken
    pub settle: MicrosDurationU32,
    /// Whole LED cycle, on and off
    pub cycle: MicrosDurationU32,
}

impl PulseTiming {
    /// Datasheet timing: sample 0.28 ms into the pulse, one pulse every 10 ms.
    pub const GP2Y1010: Self = Self {
        settle: MicrosDurationU32::from_ticks(280),
        cycle: MicrosDurationU32::from_ticks(10_000),
    };

    /// Remainder of the cycle after the sample.
    pub const fn rest(&self) -> MicrosDurationU32 {
        MicrosDurationU32::from_ticks(self.cycle.ticks().saturating_sub(self.settle.ticks()))
    }
}

/// Electrical level that turns the LED on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedPolarity {
    ActiveHigh,
    /// LED driven through a PNP transistor, the usual module wiring
    ActiveLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulsePhase {
    /// Next firing turns the LED on and starts the settle interval
    LedOn,
    /// Next firing samples the output and turns the LED off
    Sample,
}

/// Two-state LED/sample cycle, stepped once per fast-timer firing.
pub struct DustPulse<'a, P, S> {
    led: P,
    polarity: LedPolarity,
    timing: PulseTiming,
    converter: &'a SharedConverter<S>,
    slot: &'a DustSlot,
    phase: PulsePhase,
}

impl<'a, P, S> DustPulse<'a, P, S>
where
    P: OutputPin,
    S: AnalogSampler,
{
    /// Creates the machine in [`PulsePhase::LedOn`] and drives the LED off.
    pub fn new(
        mut led: P,
        polarity: LedPolarity,
        timing: PulseTiming,
        converter: &'a SharedConverter<S>,
        slot: &'a DustSlot,
    ) -> Self {
        if let Err(e) = Self::drive(&mut led, polarity, false) {
            error!("Dust LED init failed: {:?}", e);
        }
        Self {
            led,
            polarity,
            timing,
            converter,
            slot,
            phase: PulsePhase::LedOn,
        }
    }

    pub const fn phase(&self) -> PulsePhase {
        self.phase
    }

    /// Delay to arm the timer with before the first firing.
    pub const fn initial_delay(&self) -> MicrosDurationU32 {
        self.timing.rest()
    }

    /// Perform one step. Returns the delay until the next firing.
    ///
    /// Called from the fast timer interrupt. A failed conversion keeps the
    /// previous sample in the slot; the cycle itself never stops.
    pub fn fire(&mut self) -> MicrosDurationU32 {
        match self.phase {
            PulsePhase::LedOn => {
                self.set_led(true);
                self.phase = PulsePhase::Sample;
                self.timing.settle
            }
            PulsePhase::Sample => {
                match self.converter.sample(Channel::Dust) {
                    Ok(sample) => self.slot.store(sample),
                    Err(e) => error!("Dust conversion skipped: {}", e),
                }
                self.set_led(false);
                self.phase = PulsePhase::LedOn;
                self.timing.rest()
            }
        }
    }

    fn set_led(&mut self, on: bool) {
        if let Err(e) = Self::drive(&mut self.led, self.polarity, on) {
            error!("Dust LED drive failed: {:?}", e);
        }
    }

    fn drive(led: &mut P, polarity: LedPolarity, on: bool) -> Result<(), P::Error> {
        match (polarity, on) {
            (LedPolarity::ActiveHigh, true) | (LedPolarity::ActiveLow, false) => led.set_high(),
            (LedPolarity::ActiveHigh, false) | (LedPolarity::ActiveLow, true) => led.set_low(),
        }
    }
}

/// Linear output-voltage to dust-density mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DustCalibration {
    /// Output voltage with no dust (V)
    pub offset_volts: f32,
    /// Output slope (V per mg/m³)
    pub sensitivity: f32,
}

impl DustCalibration {
    pub const GP2Y1010: Self = Self {
        offset_volts: 0.1,
        sensitivity: 5.8,
    };

    /// Dust density in µg/m³, floored at zero below the offset voltage.
    pub fn density(&self, volts: f32) -> f32 {
        let density = 1000.0 * (volts - self.offset_volts) / self.sensitivity;
        if density < 0.0 { 0.0 } else { density }
    }
}

impl Default for DustCalibration {
    fn default() -> Self {
        Self::GP2Y1010
    }
}

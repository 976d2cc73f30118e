//! Hand-written `embedded-hal` fakes shared by the unit tests

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType as I2cErrorType, I2c, Operation};

use crate::analog::{AnalogSampler, Channel, RawSample};

/// Converter returning a fixed value per channel and recording the order in
/// which channels were converted.
pub struct FixedSampler {
    pub gas: u16,
    pub dust: u16,
    pub conversions: heapless::Vec<Channel, 64>,
}

impl FixedSampler {
    pub fn new(gas: u16, dust: u16) -> Self {
        Self {
            gas,
            dust,
            conversions: heapless::Vec::new(),
        }
    }
}

impl AnalogSampler for FixedSampler {
    fn sample(&mut self, channel: Channel) -> RawSample {
        let _ = self.conversions.push(channel);
        match channel {
            Channel::Gas => RawSample(self.gas),
            Channel::Dust => RawSample(self.dust),
        }
    }
}

/// I2C bus answering every read with fixed bytes, or failing with
/// `ErrorKind::Other` when `response` is `None`.
pub struct FakeBus {
    pub response: Option<[u8; 4]>,
    pub last_address: Option<u8>,
    pub last_register: Option<u8>,
}

impl FakeBus {
    pub fn answering(response: [u8; 4]) -> Self {
        Self {
            response: Some(response),
            last_address: None,
            last_register: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            response: None,
            last_address: None,
            last_register: None,
        }
    }
}

impl I2cErrorType for FakeBus {
    type Error = ErrorKind;
}

impl I2c for FakeBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.last_address = Some(address);
        let response = self.response.ok_or(ErrorKind::Other)?;
        for op in operations {
            match op {
                Operation::Write(bytes) => self.last_register = bytes.first().copied(),
                Operation::Read(buffer) => {
                    let len = buffer.len().min(response.len());
                    buffer[..len].copy_from_slice(&response[..len]);
                }
            }
        }
        Ok(())
    }
}

/// Output pin recording every level written to it.
pub struct RecordingPin {
    pub levels: heapless::Vec<bool, 64>,
}

impl RecordingPin {
    pub fn new() -> Self {
        Self {
            levels: heapless::Vec::new(),
        }
    }
}

impl PinErrorType for RecordingPin {
    type Error = Infallible;
}

impl OutputPin for RecordingPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let _ = self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let _ = self.levels.push(true);
        Ok(())
    }
}

/// Input pin held at a fixed level.
pub struct LevelPin {
    pub high: bool,
}

impl PinErrorType for LevelPin {
    type Error = Infallible;
}

impl InputPin for LevelPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

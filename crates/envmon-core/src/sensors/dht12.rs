use embedded_hal::i2c::I2c;
use log::error;

use super::{ClimateReading, SensorError};

/// Default 7-bit bus address of the DHT12.
pub const DHT12_ADDRESS: u8 = 0x5C;

/// First register of the humidity/temperature block.
const DATA_REGISTER: u8 = 0x00;

/// Sign bit in the temperature decimal byte.
const TEMPERATURE_NEGATIVE: u8 = 0x80;

/// DHT12 temperature/humidity sensor on a blocking I2C bus.
///
/// One measurement is a register read of four bytes:
/// humidity integer, humidity tenths, temperature integer, temperature tenths.
pub struct Dht12<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Dht12<I> {
    pub const fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn read(&mut self) -> Result<ClimateReading, SensorError> {
        let mut raw = [0u8; 4];
        self.i2c
            .write_read(self.address, &[DATA_REGISTER], &mut raw)
            .map_err(|e| {
                error!("DHT12 register read failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "DHT12",
                    operation: "read humidity/temperature registers",
                    details: "I2C communication error or sensor not responding",
                }
            })?;

        Ok(decode(raw))
    }

    pub fn release(self) -> I {
        self.i2c
    }
}

/// Decode the 4-byte measurement block.
///
/// Out-of-range bytes are passed through unchanged; plausibility is left to
/// whoever presents the value.
pub fn decode(raw: [u8; 4]) -> ClimateReading {
    let [hum_int, hum_dec, temp_int, temp_dec] = raw;

    let humidity_pct = hum_int as f32 + 0.1 * hum_dec as f32;
    let magnitude = temp_int as f32 + 0.1 * (temp_dec & !TEMPERATURE_NEGATIVE) as f32;
    let temperature_c = if temp_dec & TEMPERATURE_NEGATIVE != 0 {
        -magnitude
    } else {
        magnitude
    };

    ClimateReading {
        temperature_c,
        humidity_pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBus;

    #[test]
    fn test_decode_positive() {
        let reading = decode([45, 3, 23, 7]);
        assert!((reading.humidity_pct - 45.3).abs() < 1e-4);
        assert!((reading.temperature_c - 23.7).abs() < 1e-4);
    }

    #[test]
    fn test_decode_negative_temperature() {
        let reading = decode([80, 0, 5, 0x80 | 2]);
        assert!((reading.temperature_c + 5.2).abs() < 1e-4);
    }

    #[test]
    fn test_read_uses_register_zero() {
        let mut sensor = Dht12::new(FakeBus::answering([50, 0, 25, 0]), DHT12_ADDRESS);

        let reading = sensor.read().unwrap();
        assert_eq!(reading.temperature_c, 25.0);
        assert_eq!(reading.humidity_pct, 50.0);

        let bus = sensor.release();
        assert_eq!(bus.last_address, Some(DHT12_ADDRESS));
        assert_eq!(bus.last_register, Some(0));
    }

    #[test]
    fn test_read_failure_maps_to_sensor_error() {
        let mut sensor = Dht12::new(FakeBus::failing(), DHT12_ADDRESS);
        assert!(matches!(
            sensor.read(),
            Err(SensorError::ReadFailed { sensor: "DHT12", .. })
        ));
    }
}

// sht21.rs

use std::fmt;

use crc::{Algorithm, Crc};
use embedded_hal::{delay::DelayNs, i2c::I2c};

use crate::*;

const CMD_TEMP_NO_HOLD: u8 = 0xF3;
const CMD_RH_NO_HOLD: u8 = 0xF5;

// worst case conversion times for 14-bit T and 12-bit RH
const TEMP_CONVERSION_MS: u32 = 85;
const RH_CONVERSION_MS: u32 = 29;

// two low bits of the LSB are status flags, not data
const STATUS_MASK: u16 = 0x0003;

/// CRC-8 used by the SHT2x family: x^8 + x^5 + x^4 + 1, init 0, no reflection.
pub const SHT21_CRC: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0x00,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0xa2,
    residue: 0x00,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Measurement {
    Temperature,
    Humidity,
}

impl Measurement {
    fn command(self) -> u8 {
        match self {
            Measurement::Temperature => CMD_TEMP_NO_HOLD,
            Measurement::Humidity => CMD_RH_NO_HOLD,
        }
    }

    fn conversion_ms(self) -> u32 {
        match self {
            Measurement::Temperature => TEMP_CONVERSION_MS,
            Measurement::Humidity => RH_CONVERSION_MS,
        }
    }
}

/// Raw count to degrees Celsius.
pub fn temperature_from_raw(raw: u16) -> f32 {
    let raw = raw & !STATUS_MASK;
    (-46.85 + 175.72 * f64::from(raw) / 65536.0) as f32
}

/// Raw count to percent relative humidity.
pub fn humidity_from_raw(raw: u16) -> f32 {
    let raw = raw & !STATUS_MASK;
    (-6.0 + 125.0 * f64::from(raw) / 65536.0) as f32
}

/// Anything that can hand the telemetry loop a complete reading.
pub trait ReadingSource {
    type Error: fmt::Display;

    fn read(&mut self) -> Result<Reading, Self::Error>;
}

// Bus errors are generic over the HAL; the other variants can only be
// detected after the bytes are in.
#[derive(Debug)]
pub enum SensorError<E> {
    Bus(E),
    Crc { expected: u8, got: u8 },
    Invalid,
}

impl<E: fmt::Debug> fmt::Display for SensorError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::Bus(e) => write!(f, "bus error: {e:?}"),
            SensorError::Crc { expected, got } => {
                write!(f, "checksum mismatch: expected {expected:#04x}, got {got:#04x}")
            }
            SensorError::Invalid => write!(f, "invalid reading"),
        }
    }
}

/// SHT21 / HTU21 temperature and humidity sensor in no-hold master mode.
pub struct Sht21<I2C, D> {
    i2c: I2C,
    delay: D,
    addr: u8,
    verify_crc: bool,
}

impl<I2C, D> Sht21<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    pub fn new(i2c: I2C, delay: D, config: &TelemetryConfig) -> Self {
        Self {
            i2c,
            delay,
            addr: config.sensor_addr,
            verify_crc: config.verify_crc,
        }
    }

    pub fn read_temperature(&mut self) -> Result<f32, SensorError<I2C::Error>> {
        self.measure(Measurement::Temperature)
            .map(temperature_from_raw)
    }

    pub fn read_humidity(&mut self) -> Result<f32, SensorError<I2C::Error>> {
        self.measure(Measurement::Humidity).map(humidity_from_raw)
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn measure(&mut self, m: Measurement) -> Result<u16, SensorError<I2C::Error>> {
        self.i2c
            .write(self.addr, &[m.command()])
            .map_err(SensorError::Bus)?;
        self.delay.delay_ms(m.conversion_ms());

        if self.verify_crc {
            let mut buf = [0u8; 3];
            self.i2c.read(self.addr, &mut buf).map_err(SensorError::Bus)?;
            let expected = Crc::<u8>::new(&SHT21_CRC).checksum(&buf[..2]);
            if expected != buf[2] {
                return Err(SensorError::Crc {
                    expected,
                    got: buf[2],
                });
            }
            Ok(u16::from_be_bytes([buf[0], buf[1]]))
        } else {
            let mut buf = [0u8; 2];
            self.i2c.read(self.addr, &mut buf).map_err(SensorError::Bus)?;
            Ok(u16::from_be_bytes(buf))
        }
    }
}

impl<I2C, D> ReadingSource for Sht21<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    type Error = SensorError<I2C::Error>;

    // Both transactions always run, even if the first one failed.
    fn read(&mut self) -> Result<Reading, Self::Error> {
        let temperature = self.read_temperature();
        let humidity = self.read_humidity();
        let (temperature, humidity) = (temperature?, humidity?);
        debug!("Sensor raw result: {temperature:.3}°C {humidity:.3}%RH");
        Reading::new(temperature, humidity).ok_or(SensorError::Invalid)
    }
}


// EOF

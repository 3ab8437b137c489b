use std::time::Duration;

use rppal::i2c::I2c;
use tracing::trace;

use balltrack_traits::{HwResult, Sensor};

use crate::error::{HwError, Result};
use crate::util::wait_until_with_timeout;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

/// OS bit: write 1 to start a single conversion, reads 1 when idle.
const CFG_OS: u16 = 0x8000;
/// PGA +/-4.096 V.
const CFG_PGA_4V096: u16 = 0b001 << 9;
const CFG_MODE_SINGLE: u16 = 1 << 8;
/// 860 samples per second.
const CFG_DR_860: u16 = 0b111 << 5;
const CFG_COMP_DISABLE: u16 = 0b11;

const FULL_SCALE_V: f32 = 4.096;
/// The distance curve is expressed in 10-bit counts of a 5 V reference.
const REF_V: f32 = 5.0;
const COUNTS_10BIT: f32 = 1023.0;

/// Single-ended ADS1115 input, reported as 10-bit-equivalent counts.
pub struct Ads1115Sensor {
    i2c: I2c,
    config: u16,
    timeout: Duration,
}

impl Ads1115Sensor {
    pub fn new(address: u16, channel: u8, timeout: Duration) -> Result<Self> {
        if channel > 3 {
            return Err(HwError::I2c(format!("invalid ADS1115 channel {channel}")));
        }
        let mut i2c = I2c::new().map_err(|e| HwError::I2c(e.to_string()))?;
        i2c.set_slave_address(address)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        let mux = (0b100 | u16::from(channel)) << 12;
        let config = CFG_OS | mux | CFG_PGA_4V096 | CFG_MODE_SINGLE | CFG_DR_860 | CFG_COMP_DISABLE;
        let sensor = Self {
            i2c,
            config,
            timeout,
        };
        // Fail at open when nothing answers at the address.
        sensor.read_register(REG_CONFIG).map_err(|e| {
            HwError::I2c(format!("no ADS1115 answering at {address:#04x}: {e}"))
        })?;
        Ok(sensor)
    }

    fn read_register(&self, reg: u8) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(&[reg], &mut buf)
            .map_err(|e| HwError::I2c(e.to_string()))?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Start one conversion and wait for it.
    pub fn read_conversion(&mut self) -> Result<i16> {
        let [hi, lo] = self.config.to_be_bytes();
        self.i2c
            .write(&[REG_CONFIG, hi, lo])
            .map_err(|e| HwError::I2c(e.to_string()))?;
        wait_until_with_timeout(
            || Ok((self.read_register(REG_CONFIG)? & CFG_OS) != 0),
            self.timeout,
            Duration::from_micros(200),
        )?;
        let raw = self.read_register(REG_CONVERSION)? as i16;
        trace!(raw, "ads1115 raw read");
        Ok(raw)
    }
}

/// Scale a conversion result to 10-bit counts of the 5 V reference.
pub fn to_10bit_counts(raw: i16) -> u16 {
    let volts = f32::from(raw.max(0)) * FULL_SCALE_V / 32_768.0;
    (volts / REF_V * COUNTS_10BIT).round().clamp(0.0, COUNTS_10BIT) as u16
}

impl Sensor for Ads1115Sensor {
    fn read_raw(&mut self) -> HwResult<u16> {
        let mut attempts = 0;
        let max_attempts = 3;
        loop {
            match self.read_conversion() {
                Ok(raw) => return Ok(to_10bit_counts(raw)),
                Err(HwError::ConversionTimeout) if attempts < max_attempts => {
                    attempts += 1;
                    tracing::warn!(retries = attempts, "adc timeout, retrying");
                }
                Err(e) => return Err(Box::new(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::to_10bit_counts;

    #[test]
    fn scaling_to_10bit() {
        assert_eq!(to_10bit_counts(-5), 0);
        // 2.5 V -> half of the 5 V range
        assert_eq!(to_10bit_counts(20_000), 512);
        assert_eq!(to_10bit_counts(i16::MAX), 838);
    }
}

//! Per-tick distance sampling: average N raw conversions, map through the
//! calibration curve.

use balltrack_traits::Sensor;

use crate::calibration::PowerLaw;
use crate::error::FirmwareError;
use crate::hw_error::map_hw_error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Mean of the raw conversions.
    pub avg_raw: f32,
    pub distance_cm: f32,
}

#[derive(Debug, Clone)]
pub struct Sampler {
    readings: u32,
    curve: PowerLaw,
}

impl Sampler {
    pub fn new(readings: u32, curve: PowerLaw) -> Self {
        Self {
            readings: readings.max(1),
            curve,
        }
    }

    pub fn readings(&self) -> u32 {
        self.readings
    }

    pub fn curve(&self) -> PowerLaw {
        self.curve
    }

    /// Take one averaged sample. Any failed conversion aborts the whole
    /// sample.
    pub fn sample<S: Sensor + ?Sized>(&self, sensor: &mut S) -> Result<Sample, FirmwareError> {
        let mut sum: u64 = 0;
        for _ in 0..self.readings {
            let raw = sensor.read_raw().map_err(|e| map_hw_error(e.as_ref()))?;
            sum += u64::from(raw);
        }
        let avg_raw = (sum as f64 / f64::from(self.readings)) as f32;
        let distance_cm = self.curve.to_cm(avg_raw);
        tracing::trace!(avg_raw, distance_cm, "sample");
        Ok(Sample {
            avg_raw,
            distance_cm,
        })
    }
}

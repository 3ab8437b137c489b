//! Test and helper mocks for balltrack_core.

use std::collections::VecDeque;

use balltrack_traits::{HwResult, Sensor, Servo};

/// A sensor that always returns the same raw count.
#[derive(Debug, Clone, Copy)]
pub struct ConstSensor(pub u16);

impl Sensor for ConstSensor {
    fn read_raw(&mut self) -> HwResult<u16> {
        Ok(self.0)
    }
}

/// Replays a sequence of raw counts, repeating the last one when exhausted.
#[derive(Debug, Clone, Default)]
pub struct SeqSensor {
    values: VecDeque<u16>,
    last: u16,
}

impl SeqSensor {
    pub fn new(values: impl IntoIterator<Item = u16>) -> Self {
        Self {
            values: values.into_iter().collect(),
            last: 0,
        }
    }
}

impl Sensor for SeqSensor {
    fn read_raw(&mut self) -> HwResult<u16> {
        if let Some(v) = self.values.pop_front() {
            self.last = v;
        }
        Ok(self.last)
    }
}

/// A sensor whose reads fail while `failing` is set.
#[derive(Debug, Clone, Copy)]
pub struct FlakySensor {
    pub raw: u16,
    pub failing: bool,
}

impl Sensor for FlakySensor {
    fn read_raw(&mut self) -> HwResult<u16> {
        if self.failing {
            Err(Box::new(std::io::Error::other("adc not responding")))
        } else {
            Ok(self.raw)
        }
    }
}

/// Records every commanded angle.
#[derive(Debug, Clone, Default)]
pub struct SpyServo {
    pub angles: Vec<u8>,
    pub fail: bool,
}

impl SpyServo {
    pub fn last(&self) -> Option<u8> {
        self.angles.last().copied()
    }
}

impl Servo for SpyServo {
    fn write_angle(&mut self, degrees: u8) -> HwResult<()> {
        if self.fail {
            return Err(Box::new(std::io::Error::other("pwm write failed")));
        }
        self.angles.push(degrees);
        Ok(())
    }
}

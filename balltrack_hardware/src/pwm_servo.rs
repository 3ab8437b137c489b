use std::time::Duration;

use rppal::pwm::{Channel, Polarity, Pwm};

use balltrack_traits::{HwResult, Servo};

use crate::error::{HwError, Result};

/// Standard hobby-servo frame.
const PERIOD: Duration = Duration::from_millis(20);

/// Hobby servo on a hardware PWM channel.
pub struct PwmServo {
    pwm: Pwm,
    min_pulse_us: u64,
    max_pulse_us: u64,
}

impl PwmServo {
    pub fn new(channel: u8, min_pulse_us: u64, max_pulse_us: u64) -> Result<Self> {
        let channel = match channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => return Err(HwError::Pwm(format!("invalid PWM channel {other}"))),
        };
        let mid = Duration::from_micros(pulse_us(90, min_pulse_us, max_pulse_us));
        let pwm = Pwm::with_period(channel, PERIOD, mid, Polarity::Normal, true)
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        Ok(Self {
            pwm,
            min_pulse_us,
            max_pulse_us,
        })
    }
}

/// Linear map from 0..=180 degrees to the pulse range.
pub fn pulse_us(degrees: u8, min_pulse_us: u64, max_pulse_us: u64) -> u64 {
    let deg = u64::from(degrees.min(180));
    min_pulse_us + (max_pulse_us.saturating_sub(min_pulse_us) * deg) / 180
}

impl Servo for PwmServo {
    fn write_angle(&mut self, degrees: u8) -> HwResult<()> {
        let us = pulse_us(degrees, self.min_pulse_us, self.max_pulse_us);
        self.pwm
            .set_pulse_width(Duration::from_micros(us))
            .map_err(|e| HwError::Pwm(e.to_string()))?;
        tracing::trace!(degrees, pulse_us = us, "servo pulse");
        Ok(())
    }
}

//! Type-state builder for `Firmware`.
//!
//! `build()` is only available once both a sensor and a servo are set; the
//! configuration is validated there.

use std::sync::Arc;

use balltrack_traits::clock::{Clock, MonotonicClock};
use balltrack_traits::{Sensor, Servo};

use crate::config::FirmwareCfg;
use crate::error::{BuildError, Result};
use crate::firmware::{Firmware, MaeAccumulator};
use crate::line_buffer::LineBuffer;
use crate::mode::Mode;
use crate::pid::Pid;
use crate::sampler::Sampler;

// ── Type-state markers ───────────────────────────────────────────────────────

/// Placeholder for a part that has not been provided yet.
#[derive(Debug, Default)]
pub struct Missing;

pub struct FirmwareBuilder<S, V> {
    sensor: S,
    servo: V,
    cfg: Option<FirmwareCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl Default for FirmwareBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            sensor: Missing,
            servo: Missing,
            cfg: None,
            clock: None,
        }
    }
}

impl FirmwareBuilder<Missing, Missing> {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Chainable setters that do not affect type-state.
impl<S, V> FirmwareBuilder<S, V> {
    pub fn with_config(mut self, cfg: FirmwareCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<V> FirmwareBuilder<Missing, V> {
    pub fn with_sensor<S: Sensor>(self, sensor: S) -> FirmwareBuilder<S, V> {
        FirmwareBuilder {
            sensor,
            servo: self.servo,
            cfg: self.cfg,
            clock: self.clock,
        }
    }
}

impl<S> FirmwareBuilder<S, Missing> {
    pub fn with_servo<V: Servo>(self, servo: V) -> FirmwareBuilder<S, V> {
        FirmwareBuilder {
            sensor: self.sensor,
            servo,
            cfg: self.cfg,
            clock: self.clock,
        }
    }
}

impl<S: Sensor, V: Servo> FirmwareBuilder<S, V> {
    /// Validate the configuration and build the firmware. Call
    /// [`Firmware::boot`] before feeding input.
    pub fn build(self) -> Result<Firmware<S, V>> {
        let cfg = self.cfg.unwrap_or_default();
        validate(&cfg)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(c) => c,
            None => Arc::new(MonotonicClock::new()),
        };
        let epoch = clock.now();
        let c = &cfg.control;
        let pid = Pid::new(c.kp, c.ki, c.kd);
        let sampler = Sampler::new(cfg.sampling.readings, cfg.sampling.curve);
        let lines = LineBuffer::new(cfg.max_line_len_or_default());

        Ok(Firmware {
            sensor: self.sensor,
            servo: self.servo,
            sampler,
            pid,
            setpoint_cm: c.setpoint_cm,
            zero_deg: cfg.servo.zero_deg,
            mode: Mode::Idle,
            distance_cm: 0.0,
            mae: MaeAccumulator::default(),
            lines,
            clock,
            epoch,
            last_sample_ms: 0,
            last_control_ms: None,
            last_servo_deg: None,
            ticks: 0,
            cfg,
        })
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(cfg: &FirmwareCfg) -> Result<()> {
    let t = &cfg.timing;
    if t.tick_ms == 0 {
        return Err(invalid("tick_ms must be >= 1"));
    }
    if t.run_cutoff_ms <= t.hold_after_ms {
        return Err(invalid("run_cutoff_ms must exceed hold_after_ms"));
    }
    if t.hold_window_ms == 0 {
        return Err(invalid("hold_window_ms must be >= 1"));
    }
    let s = &cfg.servo;
    if !(0..=180).contains(&s.min_deg) || !(0..=180).contains(&s.max_deg) {
        return Err(invalid("servo limits must lie within 0..=180"));
    }
    if s.min_deg >= s.max_deg {
        return Err(invalid("servo min_deg must be < max_deg"));
    }
    if !(s.min_deg..=s.max_deg).contains(&s.zero_deg) {
        return Err(invalid("servo zero_deg outside travel limits"));
    }
    if cfg.sampling.readings == 0 {
        return Err(invalid("sampler readings must be >= 1"));
    }
    let curve = cfg.sampling.curve;
    if !(curve.coefficient.is_finite() && curve.coefficient > 0.0) {
        return Err(invalid("sensor coefficient must be > 0"));
    }
    if !(curve.exponent.is_finite() && curve.exponent < 0.0) {
        return Err(invalid("sensor exponent must be < 0"));
    }
    let c = &cfg.control;
    if ![c.kp, c.ki, c.kd, c.setpoint_cm].iter().all(|v| v.is_finite()) {
        return Err(invalid("pid gains and setpoint must be finite"));
    }
    if cfg.max_line_len != 0 && cfg.max_line_len < 8 {
        return Err(invalid("max_line_len must be >= 8"));
    }
    Ok(())
}

//! `From` implementations bridging `balltrack_config` types to runtime types.

use crate::calibration::PowerLaw;
use crate::config::{ControlCfg, FirmwareCfg, ModeTiming, SamplingCfg, ServoLimits, Timestep};

// ── Timing ───────────────────────────────────────────────────────────────────

impl From<(&balltrack_config::Timing, &balltrack_config::ServoCfg)> for ModeTiming {
    fn from((t, s): (&balltrack_config::Timing, &balltrack_config::ServoCfg)) -> Self {
        Self {
            tick_ms: t.tick_ms,
            hold_after_ms: t.hold_after_ms,
            hold_window_ms: t.hold_window_ms,
            run_cutoff_ms: t.run_cutoff_ms,
            start_nudge_deg: s.start_nudge_deg,
        }
    }
}

// ── Control ──────────────────────────────────────────────────────────────────

impl From<balltrack_config::Timestep> for Timestep {
    fn from(t: balltrack_config::Timestep) -> Self {
        match t {
            balltrack_config::Timestep::Fixed => Self::Fixed,
            balltrack_config::Timestep::Measured => Self::Measured,
        }
    }
}

impl From<(&balltrack_config::PidCfg, &balltrack_config::ControllerCfg)> for ControlCfg {
    fn from((p, c): (&balltrack_config::PidCfg, &balltrack_config::ControllerCfg)) -> Self {
        Self {
            kp: p.kp,
            ki: p.ki,
            kd: p.kd,
            setpoint_cm: p.setpoint_cm,
            timestep: c.timestep.into(),
        }
    }
}

// ── Servo ────────────────────────────────────────────────────────────────────

impl From<&balltrack_config::ServoCfg> for ServoLimits {
    fn from(s: &balltrack_config::ServoCfg) -> Self {
        Self {
            zero_deg: s.zero_deg,
            min_deg: s.min_deg,
            max_deg: s.max_deg,
        }
    }
}

// ── Sensor curve ─────────────────────────────────────────────────────────────

impl From<&balltrack_config::SensorCurve> for PowerLaw {
    fn from(c: &balltrack_config::SensorCurve) -> Self {
        Self {
            coefficient: c.coefficient,
            exponent: c.exponent,
        }
    }
}

impl From<&balltrack_config::Calibration> for PowerLaw {
    fn from(c: &balltrack_config::Calibration) -> Self {
        Self {
            coefficient: c.coefficient,
            exponent: c.exponent,
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&balltrack_config::Config> for FirmwareCfg {
    fn from(c: &balltrack_config::Config) -> Self {
        Self {
            timing: (&c.timing, &c.servo).into(),
            control: (&c.pid, &c.controller).into(),
            servo: (&c.servo).into(),
            sampling: SamplingCfg {
                readings: c.sampler.readings,
                curve: (&c.sensor).into(),
            },
            max_line_len: c.protocol.max_line_len,
        }
    }
}

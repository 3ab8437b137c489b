//! Runtime configuration for the firmware.
//!
//! These are separate from the TOML-deserialized types in `balltrack_config`;
//! see `conversions` for the mapping.

use crate::calibration::PowerLaw;

/// Controller timestep policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timestep {
    /// Nominal tick period regardless of wall clock.
    #[default]
    Fixed,
    /// Elapsed time since the previous controller update.
    Measured,
}

/// Tick period and mode thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeTiming {
    pub tick_ms: u64,
    /// RUN -> HOLD after this long in RUN.
    pub hold_after_ms: u64,
    /// HOLD -> IDLE after this long in HOLD.
    pub hold_window_ms: u64,
    /// Hard bound from START to result.
    pub run_cutoff_ms: u64,
    /// Servo offset applied on START.
    pub start_nudge_deg: i32,
}

impl Default for ModeTiming {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            hold_after_ms: 10_000,
            hold_window_ms: 3_000,
            run_cutoff_ms: 15_000,
            start_nudge_deg: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlCfg {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    pub setpoint_cm: f32,
    pub timestep: Timestep,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            kp: 3.0,
            ki: 2.0,
            kd: 1.5,
            setpoint_cm: 20.0,
            timestep: Timestep::Fixed,
        }
    }
}

/// Servo travel limits in degrees; `zero_deg` is the initial level position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoLimits {
    pub zero_deg: i32,
    pub min_deg: i32,
    pub max_deg: i32,
}

impl Default for ServoLimits {
    fn default() -> Self {
        Self {
            zero_deg: 90,
            min_deg: 0,
            max_deg: 180,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingCfg {
    /// Raw readings averaged per tick.
    pub readings: u32,
    pub curve: PowerLaw,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            readings: 100,
            curve: PowerLaw::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FirmwareCfg {
    pub timing: ModeTiming,
    pub control: ControlCfg,
    pub servo: ServoLimits,
    pub sampling: SamplingCfg,
    pub max_line_len: usize,
}

impl FirmwareCfg {
    pub fn max_line_len_or_default(&self) -> usize {
        if self.max_line_len == 0 {
            crate::line_buffer::DEFAULT_MAX_LINE_LEN
        } else {
            self.max_line_len
        }
    }
}

//! Positional PID controller.
//!
//! `error = distance - setpoint`; no anti-windup. The caller picks `dt`
//! (nominal tick period or measured elapsed time, see [`Timestep`]).

use crate::config::Timestep;

#[derive(Debug, Clone, PartialEq)]
pub struct Pid {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    integral: f32,
    previous_error: f32,
    last_output: f32,
    last_error: f32,
}

impl Pid {
    pub fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            integral: 0.0,
            previous_error: 0.0,
            last_output: 0.0,
            last_error: 0.0,
        }
    }

    /// Replace the gains and clear accumulated state.
    pub fn set_gains(&mut self, kp: f32, ki: f32, kd: f32) {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self.reset();
    }

    /// Clear the integral and the derivative history. Telemetry values are
    /// kept until the next update.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
    }

    /// One controller step; returns the raw output in degrees.
    ///
    /// `dt` must be positive.
    pub fn update(&mut self, distance: f32, setpoint: f32, dt: f32) -> f32 {
        debug_assert!(dt > 0.0, "pid dt must be positive: {dt}");
        let error = distance - setpoint;
        self.integral += error * dt;
        let derivative = (error - self.previous_error) / dt;
        let output = self.kp * error + self.ki * self.integral + self.kd * derivative;
        self.previous_error = error;
        self.last_error = error;
        self.last_output = output;
        output
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn previous_error(&self) -> f32 {
        self.previous_error
    }

    pub fn last_output(&self) -> f32 {
        self.last_output
    }

    pub fn last_error(&self) -> f32 {
        self.last_error
    }
}

/// Servo angle for a controller output: `clamp(zero + round(output), min, max)`.
///
/// Non-finite outputs leave the servo at `zero` (clamped).
pub fn servo_command(zero_deg: i32, output: f32, min_deg: i32, max_deg: i32) -> u8 {
    let offset = if output.is_finite() {
        // f32 -> i64 saturates, so huge outputs pin to a limit
        output.round() as i64
    } else {
        0
    };
    let angle = (i64::from(zero_deg) + offset).clamp(i64::from(min_deg), i64::from(max_deg));
    angle.clamp(0, i64::from(u8::MAX)) as u8
}

/// Timestep to feed the controller.
///
/// `elapsed_ms` is the time since the previous controller update, `None` for
/// the first update after a reset.
pub fn timestep_s(policy: Timestep, nominal_ms: u64, elapsed_ms: Option<u64>) -> f32 {
    let nominal = nominal_ms.max(1) as f32 / 1000.0;
    match (policy, elapsed_ms) {
        (Timestep::Measured, Some(ms)) if ms > 0 => ms as f32 / 1000.0,
        _ => nominal,
    }
}

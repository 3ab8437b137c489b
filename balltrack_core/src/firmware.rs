//! The firmware context: owns the hardware, controller, mode and protocol
//! state, and is driven by `feed` (incoming bytes) and `poll` (time).
//!
//! Single-threaded and non-reentrant. Replies are appended to a caller-owned
//! buffer in the order they are produced.

use std::sync::Arc;
use std::time::Instant;

use balltrack_traits::clock::Clock;
use balltrack_traits::{Sensor, Servo};

use crate::command::{self, Command};
use crate::config::FirmwareCfg;
use crate::error::Nack;
use crate::frame;
use crate::hw_error::map_hw_error;
use crate::line_buffer::{LineBuffer, LineEvent};
use crate::mode::{self, Effect, Event, Mode};
use crate::pid::{self, Pid};
use crate::reply::Reply;
use crate::sampler::Sampler;

/// Running mean of `|distance - setpoint|` over the HOLD window.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MaeAccumulator {
    sum: f64,
    count: u32,
}

impl MaeAccumulator {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn push(&mut self, abs_err: f32) {
        self.sum += f64::from(abs_err);
        self.count = self.count.saturating_add(1);
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Mean, or 0 with no samples.
    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum / f64::from(self.count)) as f32
        }
    }
}

pub struct Firmware<S: Sensor, V: Servo> {
    pub(crate) sensor: S,
    pub(crate) servo: V,
    pub(crate) cfg: FirmwareCfg,
    pub(crate) sampler: Sampler,
    pub(crate) pid: Pid,
    pub(crate) setpoint_cm: f32,
    pub(crate) zero_deg: i32,
    pub(crate) mode: Mode,
    pub(crate) distance_cm: f32,
    pub(crate) mae: MaeAccumulator,
    pub(crate) lines: LineBuffer,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) last_sample_ms: u64,
    pub(crate) last_control_ms: Option<u64>,
    pub(crate) last_servo_deg: Option<u8>,
    pub(crate) ticks: u64,
}

impl<S: Sensor, V: Servo> core::fmt::Debug for Firmware<S, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Firmware")
            .field("mode", &self.mode)
            .field("setpoint_cm", &self.setpoint_cm)
            .field("zero_deg", &self.zero_deg)
            .field("distance_cm", &self.distance_cm)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl<S: Sensor, V: Servo> Firmware<S, V> {
    /// Park the servo and announce readiness.
    pub fn boot(&mut self, out: &mut Vec<Reply>) {
        self.park();
        self.last_sample_ms = self.now_ms();
        tracing::info!(
            zero_deg = self.zero_deg,
            setpoint_cm = self.setpoint_cm,
            tick_hz = crate::util::rate_hz(self.cfg.timing.tick_ms),
            "firmware ready"
        );
        out.push(Reply::Ready);
    }

    /// Feed raw bytes from the link. Every complete line yields exactly one
    /// reply; an overlong line yields one `NACK(OVERFLOW)`.
    pub fn feed(&mut self, bytes: &[u8], out: &mut Vec<Reply>) {
        let mut events = Vec::new();
        self.lines.push_bytes(bytes, &mut events);
        for ev in events {
            match ev {
                LineEvent::Line(line) => self.handle_line(&line, out),
                LineEvent::Overflow => {
                    tracing::warn!(max_len = self.lines.max_len(), "line overflow, discarding");
                    out.push(Reply::Nack(Nack::Overflow));
                }
            }
        }
    }

    /// Validate, parse and dispatch one line.
    pub fn handle_line(&mut self, line: &str, out: &mut Vec<Reply>) {
        let parsed = frame::decode(line).and_then(command::parse);
        match parsed {
            Ok(cmd) => {
                tracing::debug!(verb = cmd.verb(), mode = %self.mode, "command");
                self.dispatch(cmd, out);
            }
            Err(reason) => {
                tracing::debug!(%reason, "rejected frame");
                out.push(Reply::Nack(reason));
            }
        }
    }

    /// Apply a parsed command and append its reply.
    pub fn dispatch(&mut self, cmd: Command, out: &mut Vec<Reply>) {
        let reply = match cmd {
            Command::Ping => Reply::Pong,
            Command::Echo(text) => Reply::Echo(text),
            Command::Target(x) => {
                self.setpoint_cm = x;
                self.reset_controller();
                Reply::Ack
            }
            Command::Pid { kp, ki, kd } => {
                self.pid.set_gains(kp, ki, kd);
                self.last_control_ms = None;
                Reply::Ack
            }
            Command::Zero(x) => {
                self.zero_deg = x;
                self.park();
                Reply::Ack
            }
            Command::Test => {
                self.apply_event(Event::Test, out);
                Reply::Ack
            }
            Command::Start => {
                self.apply_event(Event::Start, out);
                Reply::Ack
            }
            Command::Stop => {
                self.apply_event(Event::Stop, out);
                Reply::Ack
            }
            Command::Legacy(_) => Reply::Ack,
        };
        out.push(reply);
    }

    /// Run a tick if the sampling period has elapsed.
    pub fn poll(&mut self, out: &mut Vec<Reply>) -> bool {
        let now = self.now_ms();
        if now.saturating_sub(self.last_sample_ms) < self.cfg.timing.tick_ms {
            return false;
        }
        self.last_sample_ms = now;
        self.tick_at(now, out);
        true
    }

    /// Run one tick now, regardless of the period.
    pub fn step(&mut self, out: &mut Vec<Reply>) {
        let now = self.now_ms();
        self.last_sample_ms = now;
        self.tick_at(now, out);
    }

    fn tick_at(&mut self, now: u64, out: &mut Vec<Reply>) {
        self.ticks += 1;
        self.refresh_sample();
        match self.mode {
            Mode::Idle => {}
            Mode::Test => {
                self.control(now);
                out.push(Reply::Telemetry {
                    dist: self.distance_cm,
                    sp: self.setpoint_cm,
                    err: self.pid.last_error(),
                    out: self.pid.last_output(),
                });
            }
            Mode::Run { .. } => self.control(now),
            Mode::Hold { .. } => {
                self.mae.push((self.distance_cm - self.setpoint_cm).abs());
            }
        }
        self.apply_event_at(Event::Tick, now, out);
    }

    fn refresh_sample(&mut self) {
        match self.sampler.sample(&mut self.sensor) {
            Ok(s) => self.distance_cm = s.distance_cm,
            Err(e) => {
                tracing::warn!(error = %e, kept_cm = self.distance_cm, "sample failed");
            }
        }
    }

    fn control(&mut self, now: u64) {
        let elapsed = self.last_control_ms.map(|t| now.saturating_sub(t));
        let dt = pid::timestep_s(self.cfg.control.timestep, self.cfg.timing.tick_ms, elapsed);
        let output = self.pid.update(self.distance_cm, self.setpoint_cm, dt);
        self.last_control_ms = Some(now);
        let limits = self.cfg.servo;
        let angle = pid::servo_command(self.zero_deg, output, limits.min_deg, limits.max_deg);
        self.write_servo(angle);
    }

    fn apply_event(&mut self, event: Event, out: &mut Vec<Reply>) {
        let now = self.now_ms();
        self.apply_event_at(event, now, out);
    }

    fn apply_event_at(&mut self, event: Event, now: u64, out: &mut Vec<Reply>) {
        let prev = self.mode;
        let t = mode::transition(prev, event, now, &self.cfg.timing);
        if t.next != prev {
            if t.changed_from(&prev) {
                tracing::info!(from = %prev, to = %t.next, ?event, now_ms = now, "mode change");
            } else {
                tracing::debug!(mode = %t.next, ?event, now_ms = now, "mode re-entered");
            }
        }
        self.mode = t.next;
        for effect in t.effects {
            match effect {
                Effect::ResetController => self.reset_controller(),
                Effect::Drive { offset_deg } => self.drive_offset(offset_deg),
                Effect::Park => self.park(),
                Effect::ResetMae => self.mae.reset(),
                Effect::EmitResult => {
                    let mae = self.mae.mean();
                    tracing::info!(mae, samples = self.mae.count(), "run result");
                    out.push(Reply::Result { mae });
                }
            }
        }
    }

    fn reset_controller(&mut self) {
        self.pid.reset();
        self.last_control_ms = None;
    }

    fn drive_offset(&mut self, offset_deg: i32) {
        let limits = self.cfg.servo;
        let angle = pid::servo_command(
            self.zero_deg.saturating_add(offset_deg),
            0.0,
            limits.min_deg,
            limits.max_deg,
        );
        self.write_servo(angle);
    }

    /// Move the servo to the zero position (clamped to the travel limits).
    pub fn park(&mut self) {
        self.drive_offset(0);
    }

    fn write_servo(&mut self, degrees: u8) {
        match self.servo.write_angle(degrees) {
            Ok(()) => self.last_servo_deg = Some(degrees),
            Err(e) => {
                let e = map_hw_error(e.as_ref());
                tracing::warn!(error = %e, degrees, "servo write failed");
            }
        }
    }

    /// Milliseconds since this instance was built, from the injected clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    pub fn clock(&self) -> &Arc<dyn Clock + Send + Sync> {
        &self.clock
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn setpoint_cm(&self) -> f32 {
        self.setpoint_cm
    }

    pub fn zero_deg(&self) -> i32 {
        self.zero_deg
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Most recent averaged distance.
    pub fn distance_cm(&self) -> f32 {
        self.distance_cm
    }

    pub fn mae(&self) -> &MaeAccumulator {
        &self.mae
    }

    /// Last angle the servo accepted.
    pub fn last_servo_deg(&self) -> Option<u8> {
        self.last_servo_deg
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn cfg(&self) -> &FirmwareCfg {
        &self.cfg
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn servo(&self) -> &V {
        &self.servo
    }

    pub fn servo_mut(&mut self) -> &mut V {
        &mut self.servo
    }

    pub fn into_parts(self) -> (S, V) {
        (self.sensor, self.servo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mae_mean_is_zero_without_samples() {
        let mut m = MaeAccumulator::default();
        assert_eq!(m.mean(), 0.0);
        m.push(1.0);
        m.push(3.0);
        assert_eq!(m.count(), 2);
        assert_eq!(m.mean(), 2.0);
        m.reset();
        assert_eq!(m.count(), 0);
    }
}

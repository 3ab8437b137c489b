//! Devices for the ball-on-track rig.
//!
//! The simulated track is always available. The ADS1115 ADC and PWM servo
//! drivers need the `hardware` feature on Linux (Raspberry Pi via `rppal`).
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod ads1115;
pub mod error;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod pwm_servo;
pub mod util;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use balltrack_traits::clock::Clock;
use balltrack_traits::{HwResult, Sensor, Servo};

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use ads1115::Ads1115Sensor;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use pwm_servo::PwmServo;

/// Standard gravity in cm/s².
const G_CM_S2: f32 = 981.0;
/// Rolling solid sphere: a = (5/7) g sin(theta).
const ROLLING_FACTOR: f32 = 5.0 / 7.0;
/// Integration step.
const SUBSTEP_S: f32 = 0.001;
/// Longest gap integrated in one go; longer gaps are truncated.
const MAX_CATCHUP_S: f32 = 10.0;
/// Full scale of the emulated 10-bit ADC.
const ADC_MAX: f32 = 1023.0;

/// Physical parameters of the simulated track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackParams {
    pub initial_cm: f32,
    pub min_cm: f32,
    pub max_cm: f32,
    /// Track tilt in degrees per servo degree away from `level_deg`.
    pub tilt_ratio: f32,
    /// Velocity damping per second.
    pub damping: f32,
    /// Servo angle at which the track is level.
    pub level_deg: u8,
    /// Sensor curve `cm = coefficient * raw^exponent`, inverted to emit raw
    /// counts.
    pub coefficient: f32,
    pub exponent: f32,
}

impl Default for TrackParams {
    fn default() -> Self {
        Self {
            initial_cm: 8.0,
            min_cm: 4.0,
            max_cm: 50.0,
            tilt_ratio: 0.2,
            damping: 0.8,
            level_deg: 90,
            coefficient: 12_343.85,
            exponent: -1.15,
        }
    }
}

struct TrackState {
    params: TrackParams,
    position_cm: f32,
    velocity_cm_s: f32,
    servo_deg: u8,
    last_update: Instant,
}

impl TrackState {
    fn integrate(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f32();
        self.last_update = now;
        let mut remaining = elapsed.min(MAX_CATCHUP_S);
        let p = self.params;
        let tilt_deg = (f32::from(self.servo_deg) - f32::from(p.level_deg)) * p.tilt_ratio;
        // Tilting past level rolls the ball towards the sensor.
        let accel = -ROLLING_FACTOR * G_CM_S2 * tilt_deg.to_radians().sin();
        while remaining > 0.0 {
            let dt = remaining.min(SUBSTEP_S);
            self.velocity_cm_s += (accel - p.damping * self.velocity_cm_s) * dt;
            self.position_cm += self.velocity_cm_s * dt;
            if self.position_cm <= p.min_cm {
                self.position_cm = p.min_cm;
                self.velocity_cm_s = self.velocity_cm_s.max(0.0);
            } else if self.position_cm >= p.max_cm {
                self.position_cm = p.max_cm;
                self.velocity_cm_s = self.velocity_cm_s.min(0.0);
            }
            remaining -= dt;
        }
    }

    fn raw_counts(&self) -> u16 {
        let p = self.params;
        // raw = (cm / a)^(1/b)
        let raw = (self.position_cm / p.coefficient).powf(1.0 / p.exponent);
        if raw.is_finite() {
            raw.round().clamp(0.0, ADC_MAX) as u16
        } else {
            0
        }
    }
}

/// Ball-on-track physics driven by the injected clock. Split into a sensor
/// and a servo that share the same state.
pub struct SimulatedTrack {
    state: Rc<RefCell<TrackState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl SimulatedTrack {
    pub fn new(params: TrackParams, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let position_cm = params.initial_cm.clamp(params.min_cm, params.max_cm);
        let state = TrackState {
            params,
            position_cm,
            velocity_cm_s: 0.0,
            servo_deg: params.level_deg,
            last_update: clock.now(),
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            clock,
        }
    }

    /// Ball position after integrating up to now.
    pub fn position_cm(&self) -> f32 {
        let mut s = self.state.borrow_mut();
        s.integrate(self.clock.now());
        s.position_cm
    }

    pub fn servo_deg(&self) -> u8 {
        self.state.borrow().servo_deg
    }

    pub fn split(&self) -> (SimSensor, SimServo) {
        (
            SimSensor {
                state: self.state.clone(),
                clock: self.clock.clone(),
            },
            SimServo {
                state: self.state.clone(),
                clock: self.clock.clone(),
            },
        )
    }
}

pub struct SimSensor {
    state: Rc<RefCell<TrackState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Sensor for SimSensor {
    fn read_raw(&mut self) -> HwResult<u16> {
        let mut s = self.state.borrow_mut();
        s.integrate(self.clock.now());
        Ok(s.raw_counts())
    }
}

pub struct SimServo {
    state: Rc<RefCell<TrackState>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl Servo for SimServo {
    fn write_angle(&mut self, degrees: u8) -> HwResult<()> {
        let mut s = self.state.borrow_mut();
        // Settle the motion under the previous angle before switching.
        s.integrate(self.clock.now());
        s.servo_deg = degrees.min(180);
        tracing::trace!(degrees, position_cm = s.position_cm, "sim servo");
        Ok(())
    }
}

#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and sensor calibration parsing for the ball-on-track firmware.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every table is optional; missing keys fall back to the defaults the
//!   firmware was tuned with.
//! - The calibration CSV loader enforces headers and fits the sensor's
//!   power-law curve in log-log space, with one robust refit to reduce
//!   outlier influence.
use serde::Deserialize;

/// Calibration CSV schema.
///
/// Expected headers:
/// raw,cm
///
/// Example:
/// raw,cm
/// 520,10.0
/// 270,20.0
/// 180,30.0
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct CalibrationRow {
    pub raw: u32,
    pub cm: f32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Sampling / control period in milliseconds.
    pub tick_ms: u64,
    /// RUN switches to HOLD once this long has passed since START.
    pub hold_after_ms: u64,
    /// Length of the HOLD measurement window.
    pub hold_window_ms: u64,
    /// Hard cutoff measured from START; RUN/HOLD end here regardless.
    pub run_cutoff_ms: u64,
    /// Sleep between loop iterations while waiting for input or the next tick.
    pub idle_sleep_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            hold_after_ms: 10_000,
            hold_window_ms: 3_000,
            run_cutoff_ms: 15_000,
            idle_sleep_ms: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SamplerCfg {
    /// Raw readings averaged into one sample.
    pub readings: u32,
}

impl Default for SamplerCfg {
    fn default() -> Self {
        Self { readings: 100 }
    }
}

/// Power-law transfer curve: cm = coefficient * raw^exponent.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct SensorCurve {
    pub coefficient: f32,
    pub exponent: f32,
}

impl Default for SensorCurve {
    fn default() -> Self {
        Self {
            coefficient: 12_343.85,
            exponent: -1.15,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServoCfg {
    /// Level position of the track; `ZERO(x)` overrides it at runtime.
    pub zero_deg: i32,
    pub min_deg: i32,
    pub max_deg: i32,
    /// Offset applied on START to roll the ball off the sensor rest point.
    pub start_nudge_deg: i32,
}

impl Default for ServoCfg {
    fn default() -> Self {
        Self {
            zero_deg: 90,
            min_deg: 0,
            max_deg: 180,
            start_nudge_deg: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PidCfg {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Boot-time setpoint in centimeters; `TARGET(x)` overrides it.
    pub setpoint_cm: f32,
}

impl Default for PidCfg {
    fn default() -> Self {
        Self {
            kp: 3.0,
            ki: 2.0,
            kd: 1.5,
            setpoint_cm: 20.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Timestep {
    /// Integrate with the nominal tick period; the default gains assume this.
    #[default]
    Fixed,
    /// Integrate with the measured time between controller updates.
    Measured,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ControllerCfg {
    pub timestep: Timestep,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProtocolCfg {
    /// Longest accepted line (without the newline).
    pub max_line_len: usize,
}

impl Default for ProtocolCfg {
    fn default() -> Self {
        Self { max_line_len: 512 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    /// JSON-lines log file; console logs always go to stderr.
    pub file: Option<String>,
    /// Filter for the file sink, e.g. "info" or "balltrack_core=debug".
    pub level: Option<String>,
    /// "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

/// Parameters of the simulated track used when no hardware is attached.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimCfg {
    pub initial_cm: f32,
    pub min_cm: f32,
    pub max_cm: f32,
    /// Track tilt in degrees per servo degree away from level.
    pub tilt_ratio: f32,
    /// Velocity damping per second (rolling resistance).
    pub damping: f32,
}

impl Default for SimCfg {
    fn default() -> Self {
        Self {
            initial_cm: 8.0,
            min_cm: 4.0,
            max_cm: 50.0,
            tilt_ratio: 0.2,
            damping: 0.8,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// ADS1115 I2C address.
    pub i2c_address: u16,
    /// ADS1115 single-ended input (0..=3).
    pub adc_channel: u8,
    /// Max time to wait for one ADC conversion.
    pub conversion_timeout_ms: u64,
    /// Hardware PWM channel (0 or 1).
    pub pwm_channel: u8,
    /// Pulse width at 0 degrees.
    pub servo_min_pulse_us: u64,
    /// Pulse width at 180 degrees.
    pub servo_max_pulse_us: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            i2c_address: 0x48,
            adc_channel: 0,
            conversion_timeout_ms: 5,
            pwm_channel: 0,
            servo_min_pulse_us: 500,
            servo_max_pulse_us: 2500,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub timing: Timing,
    pub sampler: SamplerCfg,
    pub sensor: SensorCurve,
    pub servo: ServoCfg,
    pub pid: PidCfg,
    pub controller: ControllerCfg,
    pub protocol: ProtocolCfg,
    pub logging: Logging,
    pub sim: SimCfg,
    pub hardware: Hardware,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Power-law fit produced from calibration rows.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    pub coefficient: f32,
    pub exponent: f32,
}

impl From<Calibration> for SensorCurve {
    fn from(c: Calibration) -> Self {
        Self {
            coefficient: c.coefficient,
            exponent: c.exponent,
        }
    }
}

impl Calibration {
    /// Fit `cm = a * raw^b` by ordinary least squares on `(ln raw, ln cm)`.
    ///
    /// Raw values must be positive and strictly monotonic, distances positive,
    /// and the fitted exponent negative (the sensor reads higher when closer).
    pub fn from_rows(rows: Vec<CalibrationRow>) -> eyre::Result<Self> {
        if rows.len() < 2 {
            eyre::bail!("calibration requires at least two rows, got {}", rows.len());
        }

        for (i, r) in rows.iter().enumerate() {
            if r.raw == 0 {
                eyre::bail!("calibration row {} has raw = 0 (must be > 0)", i);
            }
            if !(r.cm.is_finite() && r.cm > 0.0) {
                eyre::bail!("calibration row {} has non-positive distance {}", i, r.cm);
            }
        }

        // Strictly monotonic raw values (increasing or decreasing), no duplicates
        let mut dir: i8 = 0;
        for i in 1..rows.len() {
            let d = i64::from(rows[i].raw) - i64::from(rows[i - 1].raw);
            if d == 0 {
                eyre::bail!(
                    "calibration rows have duplicate raw values at index {} and {}",
                    i - 1,
                    i
                );
            }
            let step_dir = if d > 0 { 1 } else { -1 };
            if dir == 0 {
                dir = step_dir;
            } else if dir != step_dir {
                eyre::bail!(
                    "calibration raw values must be monotonic (strictly increasing or strictly decreasing)"
                );
            }
        }

        let pts: Vec<(f64, f64)> = rows
            .iter()
            .map(|r| (f64::from(r.raw).ln(), f64::from(r.cm).ln()))
            .collect();

        let (b0, ln_a0) = fit_line(&pts)?;
        let mut sumsq: f64 = 0.0;
        for (x, y) in &pts {
            let r = y - (b0 * x + ln_a0);
            sumsq += r * r;
        }
        let rms = (sumsq / (pts.len() as f64)).sqrt();

        // Reject outliers with |residual| > 2σ and refit if at least 2 remain.
        let (b, ln_a) = robust_refit(&pts, b0, ln_a0, rms, 2.0).unwrap_or((b0, ln_a0));

        if !(b.is_finite() && b < 0.0) {
            eyre::bail!("calibration exponent must be negative, fitted {b}");
        }
        let a = ln_a.exp();
        if !(a.is_finite() && a > 0.0) {
            eyre::bail!("calibration produced invalid coefficient");
        }

        Ok(Calibration {
            coefficient: a as f32,
            exponent: b as f32,
        })
    }
}

/// OLS line fit y = slope*x + intercept.
fn fit_line(pts: &[(f64, f64)]) -> eyre::Result<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for (x, y) in pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if !sxx.is_finite() || sxx == 0.0 {
        eyre::bail!("calibration cannot determine slope (degenerate X variance)");
    }
    let slope = sxy / sxx;
    if !slope.is_finite() {
        eyre::bail!("calibration produced non-finite slope");
    }
    Ok((slope, mean_y - slope * mean_x))
}

/// Single-step robust refit: drop points with |residual| > k * rms around the
/// initial line and fit again on the inliers. Returns None when the refit does
/// not apply (nothing rejected, fewer than two inliers, degenerate variance).
fn robust_refit(pts: &[(f64, f64)], slope0: f64, icpt0: f64, rms: f64, k: f64) -> Option<(f64, f64)> {
    if !(rms.is_finite() && rms > 0.0) {
        return None;
    }
    let thr = k * rms;
    let inliers: Vec<(f64, f64)> = pts
        .iter()
        .copied()
        .filter(|(x, y)| (y - (slope0 * x + icpt0)).abs() <= thr)
        .collect();
    if inliers.len() < 2 || inliers.len() == pts.len() {
        return None;
    }
    fit_line(&inliers).ok()
}

impl TryFrom<Vec<CalibrationRow>> for Calibration {
    type Error = eyre::Report;
    fn try_from(rows: Vec<CalibrationRow>) -> Result<Self, Self::Error> {
        Self::from_rows(rows)
    }
}

impl TryFrom<&[CalibrationRow]> for Calibration {
    type Error = eyre::Report;
    fn try_from(rows: &[CalibrationRow]) -> Result<Self, Self::Error> {
        Self::from_rows(rows.to_vec())
    }
}

pub fn load_calibration_csv(path: &std::path::Path) -> eyre::Result<Calibration> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open calibration CSV {:?}: {}", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["raw", "cm"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "calibration CSV must have headers 'raw,cm', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<CalibrationRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    Calibration::try_from(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Timing
        if self.timing.tick_ms == 0 {
            eyre::bail!("timing.tick_ms must be >= 1");
        }
        if self.timing.tick_ms > 10_000 {
            eyre::bail!("timing.tick_ms is unreasonably large (>10s)");
        }
        if self.timing.hold_after_ms == 0 {
            eyre::bail!("timing.hold_after_ms must be >= 1");
        }
        if self.timing.hold_window_ms == 0 {
            eyre::bail!("timing.hold_window_ms must be >= 1");
        }
        if self.timing.run_cutoff_ms <= self.timing.hold_after_ms {
            eyre::bail!("timing.run_cutoff_ms must be > timing.hold_after_ms");
        }
        if self.timing.idle_sleep_ms > self.timing.tick_ms {
            eyre::bail!("timing.idle_sleep_ms must be <= timing.tick_ms");
        }

        // Sampler
        if self.sampler.readings == 0 {
            eyre::bail!("sampler.readings must be >= 1");
        }
        if self.sampler.readings > 10_000 {
            eyre::bail!("sampler.readings is unreasonably large (>10000)");
        }

        // Sensor curve
        if !(self.sensor.coefficient.is_finite() && self.sensor.coefficient > 0.0) {
            eyre::bail!("sensor.coefficient must be > 0");
        }
        if !(self.sensor.exponent.is_finite() && self.sensor.exponent < 0.0) {
            eyre::bail!("sensor.exponent must be < 0");
        }

        // Servo
        if self.servo.min_deg < 0 || self.servo.max_deg > 180 {
            eyre::bail!("servo limits must lie within [0, 180]");
        }
        if self.servo.min_deg >= self.servo.max_deg {
            eyre::bail!("servo.min_deg must be < servo.max_deg");
        }
        if !(self.servo.min_deg..=self.servo.max_deg).contains(&self.servo.zero_deg) {
            eyre::bail!("servo.zero_deg must lie within [min_deg, max_deg]");
        }
        if self.servo.start_nudge_deg.abs() > 90 {
            eyre::bail!("servo.start_nudge_deg must be in [-90, 90]");
        }

        // PID
        for (name, v) in [
            ("kp", self.pid.kp),
            ("ki", self.pid.ki),
            ("kd", self.pid.kd),
            ("setpoint_cm", self.pid.setpoint_cm),
        ] {
            if !v.is_finite() {
                eyre::bail!("pid.{name} must be finite");
            }
        }

        // Protocol
        if self.protocol.max_line_len < 8 {
            eyre::bail!("protocol.max_line_len must be >= 8");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Sim
        if self.sim.min_cm >= self.sim.max_cm {
            eyre::bail!("sim.min_cm must be < sim.max_cm");
        }
        if !(self.sim.min_cm..=self.sim.max_cm).contains(&self.sim.initial_cm) {
            eyre::bail!("sim.initial_cm must lie within [min_cm, max_cm]");
        }
        if self.sim.damping < 0.0 {
            eyre::bail!("sim.damping must be >= 0");
        }

        // Hardware
        if self.hardware.adc_channel > 3 {
            eyre::bail!("hardware.adc_channel must be in 0..=3");
        }
        if self.hardware.pwm_channel > 1 {
            eyre::bail!("hardware.pwm_channel must be 0 or 1");
        }
        if self.hardware.conversion_timeout_ms == 0 {
            eyre::bail!("hardware.conversion_timeout_ms must be >= 1");
        }
        if self.hardware.servo_min_pulse_us >= self.hardware.servo_max_pulse_us {
            eyre::bail!("hardware.servo_min_pulse_us must be < servo_max_pulse_us");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").expect("empty toml parses");
        assert_eq!(cfg.timing.tick_ms, 100);
        assert_eq!(cfg.timing.hold_after_ms, 10_000);
        assert_eq!(cfg.timing.hold_window_ms, 3_000);
        assert_eq!(cfg.timing.run_cutoff_ms, 15_000);
        assert_eq!(cfg.sampler.readings, 100);
        assert_eq!(cfg.servo.zero_deg, 90);
        assert_eq!(cfg.protocol.max_line_len, 512);
        assert_eq!(cfg.controller.timestep, Timestep::Fixed);
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn refit_drops_single_outlier() {
        // cm = 1000 * raw^-1 exactly, plus one wild point in the middle of the range
        let mut rows: Vec<CalibrationRow> = [100u32, 125, 160, 200, 250, 320, 400, 500, 640, 800]
            .iter()
            .map(|&raw| CalibrationRow {
                raw,
                cm: 1000.0 / raw as f32,
            })
            .collect();
        rows.insert(5, CalibrationRow { raw: 280, cm: 3.0 * 1000.0 / 280.0 });
        let cal = Calibration::from_rows(rows).expect("fit");
        assert!((cal.exponent + 1.0).abs() < 0.01, "exponent {}", cal.exponent);
        assert!((cal.coefficient - 1000.0).abs() < 5.0, "coefficient {}", cal.coefficient);
    }
}

mod cli;
mod error_fmt;

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use balltrack_config::{Config, Logging};
use balltrack_core::runner::{self, InputReader, RunParams};
use balltrack_core::{FirmwareBuilder, FirmwareCfg, Reply, frame};
use balltrack_hardware::{SimulatedTrack, TrackParams};
use balltrack_traits::{Clock, MonotonicClock, Sensor, Servo};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(&cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: &Cli) -> Result<()> {
    // Pure formatting, no config or logging needed.
    if let Commands::Frame { payload } = &cli.cmd {
        println!("{}", frame::encode(payload));
        return Ok(());
    }

    let (cfg, from_file) = load_config(cli)?;
    init_tracing(cli, &cfg.logging)?;
    if from_file {
        tracing::info!(path = %cli.config.display(), "loaded config");
    } else {
        tracing::info!(path = %cli.config.display(), "config not found; using defaults");
    }
    if let Some(path) = &cli.calibration {
        tracing::info!(
            path = %path.display(),
            coefficient = cfg.sensor.coefficient,
            exponent = cfg.sensor.exponent,
            "applied sensor calibration"
        );
    }

    match &cli.cmd {
        Commands::Run {
            port,
            exit_on_eof,
            max_runtime_ms,
        } => cmd_run(&cfg, port.as_deref(), *exit_on_eof, *max_runtime_ms),
        Commands::SelfCheck => cmd_self_check(&cfg, cli.json),
        Commands::Frame { .. } => Ok(()),
    }
}

/// Load and validate the config, then apply the calibration CSV if given.
/// Returns whether the config came from a file.
fn load_config(cli: &Cli) -> Result<(Config, bool)> {
    let from_file = cli.config.exists();
    let mut cfg = if from_file {
        let text = fs::read_to_string(&cli.config)
            .wrap_err_with(|| format!("read config {}", cli.config.display()))?;
        balltrack_config::load_toml(&text)
            .wrap_err_with(|| format!("parse config {}", cli.config.display()))?
    } else {
        Config::default()
    };
    cfg.validate()?;

    if let Some(path) = &cli.calibration {
        let cal = balltrack_config::load_calibration_csv(path)?;
        cfg.sensor = cal.into();
    }
    Ok((cfg, from_file))
}

fn init_tracing(cli: &Cli, logging: &Logging) -> Result<()> {
    // RUST_LOG wins over --log-level.
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .wrap_err_with(|| format!("invalid log level {:?}", cli.log_level))?;

    let console: BoxedLayer = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(console_filter)
            .boxed()
    };

    let mut layers = vec![console];
    if let Some(file) = logging.file.as_deref() {
        layers.push(file_layer(file, logging)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .wrap_err("install tracing subscriber")
}

/// JSON-lines file sink with the configured rotation.
fn file_layer(file: &str, logging: &Logging) -> Result<BoxedLayer> {
    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;

    let appender = match logging.rotation.as_deref().unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);

    let level = logging.level.as_deref().unwrap_or("info");
    let filter =
        EnvFilter::try_new(level).wrap_err_with(|| format!("invalid logging.level {level:?}"))?;
    Ok(fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter)
        .boxed())
}

fn track_params(cfg: &Config) -> TrackParams {
    TrackParams {
        initial_cm: cfg.sim.initial_cm,
        min_cm: cfg.sim.min_cm,
        max_cm: cfg.sim.max_cm,
        tilt_ratio: cfg.sim.tilt_ratio,
        damping: cfg.sim.damping,
        level_deg: u8::try_from(cfg.servo.zero_deg).unwrap_or(90),
        coefficient: cfg.sensor.coefficient,
        exponent: cfg.sensor.exponent,
    }
}

type Devices = (Box<dyn Sensor>, Box<dyn Servo>);

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn make_devices(cfg: &Config, _clock: Arc<dyn Clock + Send + Sync>) -> Result<Devices> {
    use balltrack_hardware::{Ads1115Sensor, PwmServo};

    let hw = &cfg.hardware;
    let sensor = Ads1115Sensor::new(
        hw.i2c_address,
        hw.adc_channel,
        Duration::from_millis(hw.conversion_timeout_ms),
    )
    .wrap_err("open ADS1115")?;
    let servo = PwmServo::new(hw.pwm_channel, hw.servo_min_pulse_us, hw.servo_max_pulse_us)
        .wrap_err("open servo PWM")?;
    tracing::info!(
        i2c_address = hw.i2c_address,
        adc_channel = hw.adc_channel,
        pwm_channel = hw.pwm_channel,
        "hardware devices ready"
    );
    Ok((Box::new(sensor), Box::new(servo)))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn make_devices(cfg: &Config, clock: Arc<dyn Clock + Send + Sync>) -> Result<Devices> {
    let track = SimulatedTrack::new(track_params(cfg), clock);
    let (sensor, servo) = track.split();
    tracing::info!(initial_cm = cfg.sim.initial_cm, "using simulated track");
    Ok((Box::new(sensor), Box::new(servo)))
}

fn cmd_run(
    cfg: &Config,
    port: Option<&Path>,
    exit_on_eof: bool,
    max_runtime_ms: Option<u64>,
) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let (sensor, servo) = make_devices(cfg, clock.clone())?;
    let mut fw = FirmwareBuilder::new()
        .with_config(FirmwareCfg::from(cfg))
        .with_clock(clock)
        .with_sensor(sensor)
        .with_servo(servo)
        .build()?;

    let params = RunParams {
        exit_on_eof,
        max_runtime: max_runtime_ms.map(Duration::from_millis),
        idle_sleep: Duration::from_millis(cfg.timing.idle_sleep_ms),
    };

    let reason = match port {
        Some(path) => {
            let input = File::open(path)
                .wrap_err_with(|| format!("open {} for reading", path.display()))?;
            let mut output = OpenOptions::new()
                .write(true)
                .open(path)
                .wrap_err_with(|| format!("open {} for writing", path.display()))?;
            let reader = InputReader::spawn(input);
            runner::run(&mut fw, reader.receiver(), &mut output, &shutdown, &params)?
        }
        None => {
            let reader = InputReader::spawn(std::io::stdin());
            let mut output = std::io::stdout().lock();
            runner::run(&mut fw, reader.receiver(), &mut output, &shutdown, &params)?
        }
    };
    tracing::debug!(?reason, "run finished");
    Ok(())
}

fn cmd_self_check(cfg: &Config, json: bool) -> Result<()> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(MonotonicClock::new());
    let track = SimulatedTrack::new(track_params(cfg), clock.clone());
    let (sensor, servo) = track.split();
    let mut fw = FirmwareBuilder::new()
        .with_config(FirmwareCfg::from(cfg))
        .with_clock(clock)
        .with_sensor(sensor)
        .with_servo(servo)
        .build()?;

    let mut replies = Vec::new();
    fw.boot(&mut replies);
    fw.handle_line(&frame::encode("PING"), &mut replies);

    match replies.as_slice() {
        [Reply::Ready, Reply::Pong] => {
            let position_cm = track.position_cm();
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "ok": true, "servo_deg": track.servo_deg(), "position_cm": position_cm })
                );
            } else {
                println!(
                    "self-check ok: servo at {} deg, ball at {position_cm:.1} cm",
                    track.servo_deg()
                );
            }
            Ok(())
        }
        other => eyre::bail!("self-check failed: unexpected replies {other:?}"),
    }
}

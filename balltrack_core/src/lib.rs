#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Ball-on-track firmware core (hardware-agnostic).
//!
//! All hardware interactions go through `balltrack_traits::Sensor` and
//! `balltrack_traits::Servo`; time comes from an injected `Clock`.
//!
//! ## Architecture
//!
//! - **Frame codec**: `PAYLOAD|HH` checksum framing (`frame`) over a bounded
//!   line accumulator (`line_buffer`)
//! - **Dispatcher**: declarative verb table (`command`) applied by
//!   [`Firmware::dispatch`]
//! - **Control**: positional PID (`pid`) driving the servo once per tick
//! - **Modes**: IDLE/TEST/RUN/HOLD transitions in one pure function (`mode`)
//! - **Sampling**: averaged raw reads through a power-law curve (`sampler`,
//!   `calibration`)
//! - **Replies**: typed wire lines including telemetry (`reply`)
//! - **Runner**: reader thread + cooperative loop (`runner`)

pub mod builder;
pub mod calibration;
pub mod command;
pub mod config;
pub mod conversions;
pub mod error;
pub mod firmware;
pub mod frame;
pub mod hw_error;
pub mod line_buffer;
pub mod mocks;
pub mod mode;
pub mod pid;
pub mod reply;
pub mod runner;
pub mod sampler;
pub mod util;

pub use builder::{FirmwareBuilder, Missing};
pub use calibration::PowerLaw;
pub use command::Command;
pub use config::{ControlCfg, FirmwareCfg, ModeTiming, SamplingCfg, ServoLimits, Timestep};
pub use error::{BuildError, FirmwareError, Nack, Report, Result};
pub use firmware::{Firmware, MaeAccumulator};
pub use mode::Mode;
pub use reply::Reply;

//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "balltrack", version, about = "Ball-on-track PID firmware")]
pub struct Cli {
    /// Path to config TOML (missing file means built-in defaults)
    #[arg(long, value_name = "FILE", default_value = "etc/balltrack.toml")]
    pub config: PathBuf,

    /// Optional calibration CSV (strict `raw,cm` header)
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the firmware loop over stdin/stdout or a serial device
    Run {
        /// Serial device to read frames from and write replies to
        #[arg(long, value_name = "PATH")]
        port: Option<PathBuf>,
        /// Stop once the input reaches end of stream
        #[arg(long, action = ArgAction::SetTrue)]
        exit_on_eof: bool,
        /// Stop after this many milliseconds
        #[arg(long, value_name = "MS")]
        max_runtime_ms: Option<u64>,
    },
    /// Print a payload with its checksum appended (`PAYLOAD|HH`)
    Frame {
        /// Command text, e.g. `TARGET(25)`
        payload: String,
    },
    /// Boot a simulated firmware and check that it answers PING
    SelfCheck,
}

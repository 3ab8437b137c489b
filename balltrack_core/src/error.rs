use thiserror::Error;

/// Protocol-level rejection reasons. `Display` is the wire code placed inside
/// `NACK(...)`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nack {
    #[error("EMPTY")]
    Empty,
    #[error("CRC_MISSING")]
    CrcMissing,
    #[error("CRC_BADHEX")]
    CrcBadHex,
    #[error("CRC_FAIL")]
    CrcFail,
    #[error("OVERFLOW")]
    Overflow,
    #[error("UNKNOWN_CMD")]
    UnknownCmd,
    #[error("BAD_PID_ARGS")]
    BadPidArgs,
}

#[derive(Debug, Error, Clone)]
pub enum FirmwareError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;

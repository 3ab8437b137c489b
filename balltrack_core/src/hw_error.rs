//! Maps `Box<dyn Error>` from trait boundaries to typed `FirmwareError`.
//!
//! The traits in `balltrack_traits` use `Box<dyn Error + Send + Sync>` so
//! drivers can bring their own error types; this module converts those to the
//! typed enum, with an optional feature-gated path for
//! `balltrack_hardware::HwError` downcasting.

use crate::error::FirmwareError;

/// Map a trait-boundary error to a typed `FirmwareError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> FirmwareError {
    #[cfg(feature = "hardware-errors")]
    {
        use balltrack_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout | HwError::ConversionTimeout => FirmwareError::Timeout,
                HwError::Io(io) => FirmwareError::Io(io.to_string()),
                other => FirmwareError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        FirmwareError::Timeout
    } else {
        FirmwareError::Hardware(s)
    }
}

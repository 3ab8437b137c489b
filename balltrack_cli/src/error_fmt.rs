//! Human-readable error descriptions and structured JSON error formatting.

use balltrack_core::error::FirmwareError;
#[cfg(all(feature = "hardware", target_os = "linux"))]
use balltrack_hardware::error::HwError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(FirmwareError::Io(msg)) = err
        .chain()
        .find_map(|e| e.downcast_ref::<FirmwareError>())
    {
        return format!(
            "What happened: Writing replies failed ({msg}).\nLikely causes: The serial device was unplugged, is full, or the reader closed the pipe.\nHow to fix: Reconnect the device and rerun."
        );
    }

    #[cfg(all(feature = "hardware", target_os = "linux"))]
    if let Some(hw) = err.chain().find_map(|e| e.downcast_ref::<HwError>()) {
        return match hw {
            HwError::I2c(_) => format!(
                "What happened: Failed to open the ADC ({hw}).\nLikely causes: I2C disabled, wrong address, or insufficient permissions on /dev/i2c-1.\nHow to fix: Enable I2C, check [hardware] i2c_address and adc_channel, and add the user to the i2c group."
            ),
            HwError::Pwm(_) => format!(
                "What happened: Failed to open the servo PWM channel ({hw}).\nLikely causes: PWM overlay not enabled or wrong channel.\nHow to fix: Enable the pwm overlay and check hardware.pwm_channel."
            ),
            _ => format!(
                "What happened: Hardware error ({hw}).\nLikely causes: Wiring or power issues.\nHow to fix: Check connections and rerun with --log-level=debug."
            ),
        };
    }

    if let Some(te) = err.chain().find_map(|e| e.downcast_ref::<toml::de::Error>()) {
        return format!(
            "What happened: The config file is not valid TOML for this firmware.\nLikely causes: Typo in a key or table, or a value of the wrong type.\nHow to fix: Fix the config file. Parser said: {te}"
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    // Calibration CSV header special-case
    if lower.contains("calibration csv must have headers") {
        return "Invalid headers in calibration CSV. Expected 'raw,cm'.".to_string();
    }

    if lower.contains("calibration") {
        return format!(
            "What happened: Calibration could not be fitted ({msg}).\nLikely causes: Too few rows, repeated or unordered raw values, or a curve that rises with distance.\nHow to fix: Record at least two distinct points with raw values decreasing as distance grows."
        );
    }

    if lower.starts_with("timing.")
        || lower.starts_with("sampler.")
        || lower.starts_with("sensor.")
        || lower.starts_with("servo")
        || lower.starts_with("pid.")
        || lower.starts_with("protocol.")
        || lower.starts_with("logging.")
        || lower.starts_with("sim.")
        || lower.starts_with("hardware.")
    {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or inconsistent values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; anything unclassified returns 1.
/// Usage errors exit with 2 from clap.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if err
        .chain()
        .any(|e| matches!(e.downcast_ref::<FirmwareError>(), Some(FirmwareError::Io(_))))
    {
        return 6;
    }
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    if err.chain().any(|e| e.downcast_ref::<HwError>().is_some()) {
        return 5;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match exit_code_for_error(err) {
        6 => "Io",
        5 => "Hardware",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_io_failure_is_described_and_classified() {
        use eyre::WrapErr;
        let res: Result<(), FirmwareError> = Err(FirmwareError::Io("No space left on device".into()));
        let err = res.wrap_err("writing reply").unwrap_err();
        assert!(humanize(&err).contains("Writing replies failed"));
        assert_eq!(exit_code_for_error(&err), 6);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Io");
    }

    #[test]
    fn json_has_reason_and_message() {
        let err = eyre::eyre!("timing.tick_ms must be >= 1");
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "Error");
        assert_eq!(v["exit_code"], 1);
        assert!(
            v["message"]
                .as_str()
                .unwrap()
                .contains("Configuration is invalid")
        );
    }

    #[test]
    fn csv_header_hint() {
        let err = eyre::eyre!("calibration CSV must have headers 'raw,cm', got: raw,grams");
        assert_eq!(
            humanize(&err),
            "Invalid headers in calibration CSV. Expected 'raw,cm'."
        );
    }
}

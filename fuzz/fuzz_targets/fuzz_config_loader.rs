#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validate errors are fine; panics are not.
    if let Ok(cfg) = balltrack_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // Anything that validates must convert into a runtime config.
            let _ = balltrack_core::FirmwareCfg::from(&cfg);
        }
    }
});

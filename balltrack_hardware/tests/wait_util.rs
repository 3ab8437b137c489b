use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
use std::thread;
use std::time::Duration;

use balltrack_hardware::error::HwError;
use balltrack_hardware::util::wait_until_with_timeout;

#[test]
fn wait_until_success_path() {
    let ready = Arc::new(AtomicBool::new(false));
    let ready_bg = ready.clone();
    // Flip ready after a short delay
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(3));
        ready_bg.store(true, Ordering::Relaxed);
    });

    let res = wait_until_with_timeout(
        || Ok(ready.load(Ordering::Relaxed)),
        Duration::from_millis(50),
        Duration::from_micros(200),
    );
    assert!(res.is_ok(), "expected success, got {res:?}");
}

#[test]
fn wait_until_timeout_path() {
    let err = wait_until_with_timeout(
        || Ok(false),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected timeout error");

    match err {
        HwError::ConversionTimeout => {}
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn wait_until_propagates_predicate_errors() {
    let err = wait_until_with_timeout(
        || Err(HwError::I2c("nack".into())),
        Duration::from_millis(5),
        Duration::from_micros(200),
    )
    .expect_err("expected i2c error");
    assert!(matches!(err, HwError::I2c(_)));
}

#![no_main]
use libfuzzer_sys::fuzz_target;

use balltrack_core::mocks::{ConstSensor, SpyServo};
use balltrack_core::{FirmwareBuilder, frame};

fuzz_target!(|data: &[u8]| {
    if let Ok(line) = std::str::from_utf8(data) {
        let _ = frame::decode(line).and_then(balltrack_core::command::parse);
    }

    // Arbitrary bytes on the link: one reply per complete line, never a panic.
    let Ok(mut fw) = FirmwareBuilder::new()
        .with_sensor(ConstSensor(300))
        .with_servo(SpyServo::default())
        .build()
    else {
        return;
    };
    let mut out = Vec::new();
    fw.boot(&mut out);
    out.clear();
    fw.feed(data, &mut out);
    let lines = data.iter().filter(|&&b| b == b'\n').count();
    assert!(out.len() <= lines + data.len() / 8 + 1);
    if !data.contains(&b'\n') {
        assert!(out.iter().all(|r| matches!(r, balltrack_core::Reply::Nack(_))));
    }
});

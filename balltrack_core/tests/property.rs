use std::sync::Arc;

use balltrack_core::frame::{checksum, decode, encode};
use balltrack_core::mocks::{ConstSensor, SpyServo};
use balltrack_core::{FirmwareBuilder, Mode, Nack, Reply, command};
use balltrack_traits::clock::test_clock::ManualClock;
use proptest::prelude::*;

proptest! {
    #[test]
    fn encoded_payloads_validate(payload in "[!-{}~]{0,64}") {
        // Printable ASCII without spaces or '|': decode trims the line and
        // splits on the last separator.
        let line = encode(&payload);
        prop_assert_eq!(decode(&line), Ok(payload.as_str()));
    }

    #[test]
    fn any_other_checksum_fails(payload in "[A-Z()0-9,.]{1,32}", delta in 1u8..=255) {
        let wrong = checksum(&payload).wrapping_add(delta);
        let line = format!("{payload}|{wrong:02X}");
        prop_assert_eq!(decode(&line), Err(Nack::CrcFail));
    }

    #[test]
    fn parser_never_panics(payload in any::<String>()) {
        let _ = command::parse(&payload);
    }

    #[test]
    fn every_line_gets_exactly_one_reply(lines in prop::collection::vec("[ -~]{0,40}", 1..20)) {
        let mut fw = FirmwareBuilder::new()
            .with_sensor(ConstSensor(300))
            .with_servo(SpyServo::default())
            .with_clock(Arc::new(ManualClock::new()))
            .build()
            .unwrap();
        let mut out = Vec::new();
        fw.boot(&mut out);
        out.clear();
        let mut bytes = Vec::new();
        for l in &lines {
            bytes.extend_from_slice(l.as_bytes());
            bytes.push(b'\n');
        }
        fw.feed(&bytes, &mut out);
        prop_assert_eq!(out.len(), lines.len());
        prop_assert!(!out.iter().any(|r| matches!(r, Reply::Ready)));
    }

    #[test]
    fn rejected_frames_never_change_mode(garbage in "[ -~]{0,40}") {
        let mut fw = FirmwareBuilder::new()
            .with_sensor(ConstSensor(300))
            .with_servo(SpyServo::default())
            .with_clock(Arc::new(ManualClock::new()))
            .build()
            .unwrap();
        let mut out = Vec::new();
        fw.handle_line(&garbage, &mut out);
        if matches!(out.as_slice(), [Reply::Nack(_)]) {
            prop_assert_eq!(fw.mode(), Mode::Idle);
            prop_assert_eq!(fw.setpoint_cm(), 20.0);
        }
    }
}

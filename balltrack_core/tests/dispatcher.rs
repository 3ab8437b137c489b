use std::sync::Arc;

use balltrack_core::frame::encode;
use balltrack_core::mocks::{ConstSensor, SpyServo};
use balltrack_core::{Firmware, FirmwareBuilder, Mode, Nack, Reply};
use balltrack_traits::clock::test_clock::ManualClock;
use rstest::rstest;

fn booted() -> Firmware<ConstSensor, SpyServo> {
    let mut fw = FirmwareBuilder::new()
        .with_sensor(ConstSensor(300))
        .with_servo(SpyServo::default())
        .with_clock(Arc::new(ManualClock::new()))
        .build()
        .unwrap();
    let mut out = Vec::new();
    fw.boot(&mut out);
    assert_eq!(out, vec![Reply::Ready]);
    fw
}

fn send(fw: &mut Firmware<ConstSensor, SpyServo>, payload: &str) -> Vec<Reply> {
    let mut out = Vec::new();
    let line = format!("{}\n", encode(payload));
    fw.feed(line.as_bytes(), &mut out);
    out
}

fn send_raw(fw: &mut Firmware<ConstSensor, SpyServo>, line: &str) -> Vec<Reply> {
    let mut out = Vec::new();
    fw.feed(line.as_bytes(), &mut out);
    out
}

#[test]
fn boot_parks_servo_at_zero() {
    let fw = booted();
    assert_eq!(fw.servo().angles, vec![90]);
    assert_eq!(fw.mode(), Mode::Idle);
}

#[test]
fn ping_pongs_without_state_change() {
    let mut fw = booted();
    assert_eq!(send_raw(&mut fw, "PING|2E\n"), vec![Reply::Pong]);
    assert_eq!(fw.mode(), Mode::Idle);
    assert_eq!(fw.servo().angles.len(), 1);
}

#[test]
fn echo_preserves_argument_case() {
    let mut fw = booted();
    assert_eq!(
        send(&mut fw, "echo(Hello World)"),
        vec![Reply::Echo("Hello World".into())]
    );
    assert_eq!(send(&mut fw, "ECHO()"), vec![Reply::Echo(String::new())]);
}

#[test]
fn target_sets_setpoint_and_resets_controller() {
    let mut fw = booted();
    assert_eq!(send(&mut fw, "TARGET(26.5)"), vec![Reply::Ack]);
    assert_eq!(fw.setpoint_cm(), 26.5);
    assert_eq!(fw.pid().integral(), 0.0);
}

#[test]
fn target_with_garbage_argument_becomes_zero() {
    let mut fw = booted();
    assert_eq!(send(&mut fw, "TARGET(abc)"), vec![Reply::Ack]);
    assert_eq!(fw.setpoint_cm(), 0.0);
}

#[test]
fn pid_with_one_comma_is_rejected_and_gains_kept() {
    let mut fw = booted();
    assert_eq!(send(&mut fw, "PID(4,5,6)"), vec![Reply::Ack]);
    assert_eq!(send(&mut fw, "PID(3,2)"), vec![Reply::Nack(Nack::BadPidArgs)]);
    let pid = fw.pid();
    assert_eq!((pid.kp, pid.ki, pid.kd), (4.0, 5.0, 6.0));
}

#[test]
fn zero_truncates_and_drives_servo() {
    let mut fw = booted();
    assert_eq!(send(&mut fw, "ZERO(95.7)"), vec![Reply::Ack]);
    assert_eq!(fw.zero_deg(), 95);
    assert_eq!(fw.servo().last(), Some(95));
}

#[test]
fn zero_outside_travel_is_clamped_at_the_servo() {
    let mut fw = booted();
    assert_eq!(send(&mut fw, "ZERO(250)"), vec![Reply::Ack]);
    assert_eq!(fw.zero_deg(), 250);
    assert_eq!(fw.servo().last(), Some(180));
}

#[test]
fn zero_pid_target_each_touch_only_their_field() {
    let mut fw = booted();
    assert_eq!(send(&mut fw, "ZERO(95)"), vec![Reply::Ack]);
    assert_eq!(send(&mut fw, "PID(3,2,1.5)"), vec![Reply::Ack]);
    assert_eq!(send(&mut fw, "TARGET(26.5)"), vec![Reply::Ack]);
    assert_eq!(fw.zero_deg(), 95);
    assert_eq!(fw.setpoint_cm(), 26.5);
    let pid = fw.pid();
    assert_eq!((pid.kp, pid.ki, pid.kd), (3.0, 2.0, 1.5));
    assert_eq!(fw.mode(), Mode::Idle);
}

#[test]
fn test_then_stop_parks() {
    let mut fw = booted();
    send(&mut fw, "ZERO(93)");
    assert_eq!(send(&mut fw, "TEST"), vec![Reply::Ack]);
    assert_eq!(fw.mode(), Mode::Test);
    assert_eq!(send(&mut fw, "STOP"), vec![Reply::Ack]);
    assert_eq!(fw.mode(), Mode::Idle);
    assert_eq!(fw.servo().last(), Some(93));
}

#[test]
fn b_is_an_alias_for_stop_in_run() {
    let mut fw = booted();
    assert_eq!(send(&mut fw, "START"), vec![Reply::Ack]);
    assert!(matches!(fw.mode(), Mode::Run { .. }));
    assert_eq!(fw.servo().last(), Some(95));
    assert_eq!(send(&mut fw, "b"), vec![Reply::Ack]);
    assert_eq!(fw.mode(), Mode::Idle);
    assert_eq!(fw.servo().last(), Some(90));
}

#[rstest]
#[case("S", Reply::Ack)]
#[case("i", Reply::Ack)]
#[case("M(1)", Reply::Ack)]
#[case("r(abc)", Reply::Ack)]
#[case("V(0)", Reply::Ack)]
#[case("M()", Reply::Nack(Nack::UnknownCmd))]
#[case("M(1)x", Reply::Nack(Nack::UnknownCmd))]
#[case("V", Reply::Nack(Nack::UnknownCmd))]
#[case("PING()", Reply::Nack(Nack::UnknownCmd))]
#[case("PINGS", Reply::Nack(Nack::UnknownCmd))]
#[case("FOO", Reply::Nack(Nack::UnknownCmd))]
#[case("", Reply::Nack(Nack::UnknownCmd))]
fn legacy_and_unknown_verbs(#[case] payload: &str, #[case] expected: Reply) {
    let mut fw = booted();
    assert_eq!(send(&mut fw, payload), vec![expected]);
    assert_eq!(fw.mode(), Mode::Idle);
}

#[rstest]
#[case("PING|GG\n", Nack::CrcBadHex)]
#[case("PING\n", Nack::CrcMissing)]
#[case("START|00\n", Nack::CrcFail)]
#[case("\n", Nack::Empty)]
fn rejected_frames_change_nothing(#[case] line: &str, #[case] reason: Nack) {
    let mut fw = booted();
    assert_eq!(send_raw(&mut fw, line), vec![Reply::Nack(reason)]);
    assert_eq!(fw.mode(), Mode::Idle);
    assert_eq!(fw.setpoint_cm(), 20.0);
    assert_eq!(fw.servo().angles.len(), 1);
}

#[test]
fn overlong_line_is_one_overflow_and_tail_is_not_dispatched() {
    let mut fw = booted();
    let mut line = "A".repeat(600);
    line.push_str(&encode("START"));
    line.push('\n');
    assert_eq!(send_raw(&mut fw, &line), vec![Reply::Nack(Nack::Overflow)]);
    assert_eq!(fw.mode(), Mode::Idle);
    assert_eq!(send_raw(&mut fw, "PING|2E\n"), vec![Reply::Pong]);
}

#[test]
fn lines_may_arrive_split_across_chunks() {
    let mut fw = booted();
    let mut out = Vec::new();
    fw.feed(b"PI", &mut out);
    fw.feed(b"NG|2", &mut out);
    assert!(out.is_empty());
    fw.feed(b"E\r\nPING|2E\n", &mut out);
    assert_eq!(out, vec![Reply::Pong, Reply::Pong]);
}

#[test]
fn embedded_cr_survives_the_link_like_a_direct_line() {
    let mut fw = booted();
    let framed = encode("ECHO(a\rb)");
    assert_eq!(
        send_raw(&mut fw, &format!("{framed}\r\n")),
        vec![Reply::Echo("a\rb".into())]
    );
    let mut direct = Vec::new();
    fw.handle_line(&framed, &mut direct);
    assert_eq!(direct, vec![Reply::Echo("a\rb".into())]);
}

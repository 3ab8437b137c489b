use std::sync::Arc;

use balltrack_hardware::{SimulatedTrack, TrackParams};
use balltrack_traits::clock::test_clock::ManualClock;
use balltrack_traits::{Sensor, Servo};
use rstest::rstest;

#[rstest]
#[case(8.0)]
#[case(20.0)]
#[case(35.0)]
fn sensor_reads_higher_when_closer(#[case] initial_cm: f32) {
    let clock = ManualClock::new();
    let params = TrackParams {
        initial_cm,
        ..TrackParams::default()
    };
    let near = SimulatedTrack::new(params, Arc::new(clock.clone()));
    let far = SimulatedTrack::new(
        TrackParams {
            initial_cm: initial_cm + 5.0,
            ..params
        },
        Arc::new(clock.clone()),
    );
    let raw_near = near.split().0.read_raw().unwrap();
    let raw_far = far.split().0.read_raw().unwrap();
    assert!(raw_near > raw_far, "{raw_near} <= {raw_far}");
}

#[test]
fn servo_angle_is_visible_through_the_track() {
    let clock = ManualClock::new();
    let track = SimulatedTrack::new(TrackParams::default(), Arc::new(clock.clone()));
    let (_, mut servo) = track.split();
    assert_eq!(track.servo_deg(), 90);
    servo.write_angle(95).unwrap();
    assert_eq!(track.servo_deg(), 95);
}

#[test]
fn motion_follows_the_injected_clock_only() {
    let clock = ManualClock::new();
    let track = SimulatedTrack::new(TrackParams::default(), Arc::new(clock.clone()));
    let (_, mut servo) = track.split();
    servo.write_angle(70).unwrap();
    let before = track.position_cm();
    std::thread::sleep(std::time::Duration::from_millis(20));
    assert_eq!(track.position_cm(), before);
    clock.advance_ms(200);
    assert!(track.position_cm() > before);
}

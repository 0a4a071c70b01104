use mcs_sim::{SimConfig, SimError, SimulatedController};
use mcs_traits::{Axis, HalfBuffer, MotionController};
use rstest::rstest;

fn sim() -> SimulatedController {
    SimulatedController::new(SimConfig {
        time_int: 0.25,
        lookahead_len: 2,
        ..SimConfig::default()
    })
}

fn write(sim: &mut SimulatedController, half: HalfBuffer, p: [f64; 2]) -> Result<(), SimError> {
    match sim.write_half(Axis::Azimuth, half, &p, &[0.5, 0.5]) {
        Ok(()) => Ok(()),
        Err(e) => Err(*e.downcast::<SimError>().unwrap()),
    }
}

#[test]
fn consumes_halves_and_toggles_handshake() {
    let mut s = sim();
    s.arm_trigger(10.0).unwrap();
    write(&mut s, HalfBuffer::Top, [1.0, 2.0]).unwrap();

    s.service(9.75).unwrap();
    assert!(!s.is_running());
    assert!(!s.readback(Axis::Azimuth).unwrap().handshake);

    // At the trigger the idle bottom half is released and top is read.
    s.service(10.0).unwrap();
    assert!(s.is_running());
    assert_eq!(s.axis(Axis::Azimuth).reading(), HalfBuffer::Top);
    assert!(s.readback(Axis::Azimuth).unwrap().handshake);

    write(&mut s, HalfBuffer::Bottom, [3.0, 4.0]).unwrap();
    s.service(10.25).unwrap();
    assert_eq!(s.readback(Axis::Azimuth).unwrap().position, 1.0);

    s.service(10.5).unwrap();
    let rb = s.readback(Axis::Azimuth).unwrap();
    assert_eq!(rb.position, 2.0);
    assert_eq!(rb.velocity, 0.5);
    assert!(!rb.handshake);
    assert_eq!(s.axis(Axis::Azimuth).flips(), 2);
}

#[test]
fn holds_position_when_starved() {
    let mut s = sim();
    s.arm_trigger(10.0).unwrap();
    write(&mut s, HalfBuffer::Top, [1.0, 2.0]).unwrap();
    s.service(11.0).unwrap();
    let a = s.axis(Axis::Azimuth);
    assert_eq!(a.position(), 2.0);
    assert_eq!(a.starved(), 2);
    // Elevation never got a buffer.
    assert_eq!(s.axis(Axis::Elevation).starved(), 4);
}

#[test]
fn rejects_write_into_half_being_read() {
    let mut s = sim();
    s.arm_trigger(10.0).unwrap();
    write(&mut s, HalfBuffer::Top, [1.0, 2.0]).unwrap();
    s.service(10.0).unwrap();
    assert_eq!(
        write(&mut s, HalfBuffer::Top, [5.0, 6.0]),
        Err(SimError::HalfBusy {
            axis: Axis::Azimuth,
            half: HalfBuffer::Top
        })
    );
}

#[rstest]
#[case(&[1.0], &[1.0, 1.0])]
#[case(&[1.0, 2.0], &[1.0])]
#[case(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0])]
fn rejects_wrong_buffer_length(#[case] p: &[f64], #[case] v: &[f64]) {
    let mut s = sim();
    let err = s.write_half(Axis::Elevation, HalfBuffer::Bottom, p, v).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SimError>(),
        Some(SimError::BufferLength { expected: 2, .. })
    ));
}

#[test]
fn rearming_stops_motion() {
    let mut s = sim();
    s.arm_trigger(10.0).unwrap();
    write(&mut s, HalfBuffer::Top, [1.0, 2.0]).unwrap();
    s.service(10.25).unwrap();
    s.arm_trigger(20.0).unwrap();
    assert!(!s.is_running());
    assert!(!s.axis(Axis::Azimuth).is_loaded(HalfBuffer::Top));
    assert_eq!(s.readback(Axis::Azimuth).unwrap().position, 1.0);
}

#[test]
fn injected_fault_fails_once() {
    let mut s = sim();
    s.fail_next_write("bus timeout");
    assert_eq!(
        write(&mut s, HalfBuffer::Top, [1.0, 2.0]),
        Err(SimError::Fault("bus timeout".into()))
    );
    write(&mut s, HalfBuffer::Top, [1.0, 2.0]).unwrap();
}

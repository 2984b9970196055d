//! Actuator state machine over the recording transport.

use feelhid::backends::virtual_input::{FfbCommand, VirtualDevice, VirtualForceFeedback};
use feelhid::usage::{desktop, page};
use feelhid::{resolve_default, Device, RumbleEffect};
use proptest::prelude::*;
use std::rc::Rc;
use std::time::Duration;

/// Built-in RumblePad 2 (declares force feedback).
fn rumble_pad() -> (Device, Rc<VirtualForceFeedback>) {
    let ffb = Rc::new(VirtualForceFeedback::default());
    let raw = Rc::new(
        VirtualDevice::new(0x046d, 0xc218, page::GENERIC_DESKTOP, desktop::GAMEPAD)
            .with_force_feedback(ffb.clone()),
    );
    (resolve_default(raw).expect("resolve"), ffb)
}

#[derive(Debug, Clone)]
enum Op {
    Start,
    Stop,
    Intensity(f32),
    Duration(f32),
    Unplug,
    Replug,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Stop),
        any::<f32>().prop_map(Op::Intensity),
        any::<f32>().prop_map(Op::Duration),
        Just(Op::Unplug),
        Just(Op::Replug),
    ]
}

#[test]
fn start_stop_keeps_parameters() {
    let (mut device, ffb) = rumble_pad();
    let actuator = device.actuator_mut().expect("actuator");
    actuator.set_intensity(0.5);
    actuator.set_duration(2.0);
    actuator.start();
    actuator.stop();

    assert!(!actuator.is_active());
    assert_eq!(actuator.intensity(), 0.5);
    assert_eq!(actuator.duration(), 2.0);
    assert_eq!(
        ffb.commands(),
        vec![
            FfbCommand::Play(RumbleEffect {
                magnitude: 0.5,
                duration: Some(Duration::from_secs(2)),
            }),
            FfbCommand::Halt,
        ]
    );
}

#[test]
fn restart_while_running_replays() {
    let (mut device, ffb) = rumble_pad();
    let actuator = device.actuator_mut().expect("actuator");
    actuator.set_duration(10.0);
    actuator.start();
    actuator.set_intensity(0.25);
    actuator.start();
    assert!(actuator.is_active());
    let remaining = actuator.remaining().expect("bounded effect");
    assert!(remaining <= Duration::from_secs(10));
    assert_eq!(ffb.commands().len(), 2);
}

#[test]
fn unplugged_start_is_logged_not_surfaced() {
    let (mut device, ffb) = rumble_pad();
    ffb.disconnect();
    let actuator = device.actuator_mut().expect("actuator");
    actuator.start();
    assert!(!actuator.is_active());
    actuator.stop();
    assert!(ffb.commands().is_empty());
}

#[test]
fn no_transport_means_no_actuator() {
    // Descriptor declares a motor, transport has none.
    let raw = Rc::new(VirtualDevice::new(
        0x046d,
        0xc218,
        page::GENERIC_DESKTOP,
        desktop::GAMEPAD,
    ));
    let mut device = resolve_default(raw).expect("resolve");
    assert!(device.descriptor().force_feedback);
    assert!(!device.has_actuator());
    assert!(device.actuator_mut().is_none());
}

#[test]
fn motor_left_running_by_a_rejected_restart_is_halted() {
    let (mut device, ffb) = rumble_pad();
    let actuator = device.actuator_mut().expect("actuator");
    actuator.set_duration(0.0);
    actuator.start();
    ffb.disconnect();
    actuator.start();
    ffb.reconnect();
    actuator.stop();

    assert!(!actuator.is_active());
    assert_eq!(
        ffb.commands(),
        vec![
            FfbCommand::Play(RumbleEffect {
                magnitude: 1.0,
                duration: None
            }),
            FfbCommand::Halt
        ]
    );
}

#[test]
fn dropping_after_a_rejected_restart_halts() {
    let (mut device, ffb) = rumble_pad();
    let actuator = device.actuator_mut().expect("actuator");
    actuator.start();
    ffb.disconnect();
    actuator.start();
    ffb.reconnect();
    drop(device);
    assert_eq!(ffb.commands().last(), Some(&FfbCommand::Halt));
}

#[test]
fn dropping_the_device_halts_the_motor() {
    let (mut device, ffb) = rumble_pad();
    let actuator = device.actuator_mut().expect("actuator");
    actuator.set_duration(0.0);
    actuator.start();
    drop(device);
    assert_eq!(ffb.commands().last(), Some(&FfbCommand::Halt));
}

proptest! {
    /// Whatever came before, stop() leaves the actuator inactive.
    #[test]
    fn prop_stop_always_deactivates(ops in prop::collection::vec(op(), 0..32)) {
        let (mut device, ffb) = rumble_pad();
        let actuator = device.actuator_mut().ok_or_else(|| TestCaseError::fail("actuator"))?;
        for op in ops {
            match op {
                Op::Start => actuator.start(),
                Op::Stop => actuator.stop(),
                Op::Intensity(v) => actuator.set_intensity(v),
                Op::Duration(v) => actuator.set_duration(v),
                Op::Unplug => ffb.disconnect(),
                Op::Replug => ffb.reconnect(),
            }
        }
        actuator.stop();
        prop_assert!(!actuator.is_active());
        prop_assert_eq!(actuator.remaining(), None);
    }

    /// Played magnitudes are always within [0, 1].
    #[test]
    fn prop_played_magnitude_is_clamped(intensity in any::<f32>()) {
        let (mut device, ffb) = rumble_pad();
        let actuator = device.actuator_mut().ok_or_else(|| TestCaseError::fail("actuator"))?;
        actuator.set_intensity(intensity);
        actuator.start();
        for command in ffb.commands() {
            if let FfbCommand::Play(effect) = command {
                prop_assert!((0.0..=1.0).contains(&effect.magnitude));
            }
        }
        if !intensity.is_nan() {
            prop_assert_eq!(actuator.intensity().to_bits(), intensity.to_bits());
        }
    }
}

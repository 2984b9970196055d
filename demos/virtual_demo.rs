use feelhid::backends::virtual_input::{VirtualDevice, VirtualForceFeedback};
use feelhid::logger::Logger;
use feelhid::usage::{desktop, page};
use feelhid::{EventFilter, InputEventBus, Manager, ManagerConfig};
use std::rc::Rc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut mgr = Manager::new(ManagerConfig::default()).expect("build manager");

    // A RumblePad 2 as far as the built-in table is concerned.
    let ffb = Rc::new(VirtualForceFeedback::default());
    let pad = Rc::new(
        VirtualDevice::new(0x046d, 0xc218, page::GENERIC_DESKTOP, desktop::GAMEPAD)
            .with_location("virtual:demo")
            .with_force_feedback(ffb.clone()),
    );
    let id = mgr
        .attach(pad.clone())
        .expect("attach")
        .expect("recognized by the built-in table");

    let mut bus = InputEventBus::new();
    bus.add_listener(Logger::new(), EventFilter::All, None);

    // Inject some sample input
    pad.set_axis(desktop::X, 200, 0, 255);
    pad.press(1);
    pad.set_hat(2, 0, 7);
    pad.release(1);
    println!("dispatched {} events", mgr.dispatch(&mut bus));

    if let Some(actuator) = mgr.device_mut(&id).and_then(|d| d.actuator_mut()) {
        actuator.set_intensity(0.6);
        actuator.set_duration(0.5);
        actuator.start();
        actuator.stop();
    }
    println!("motor commands: {:?}", ffb.commands());

    for device in mgr.devices() {
        println!("{}", device.meta());
    }
}

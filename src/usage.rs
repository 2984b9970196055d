//! HID usage page / usage constants and friendly names.
//!
//! Only the handful of usages the matcher and decoders care about are listed;
//! see the HID Usage Tables for the rest.

/// Usage pages.
pub mod page {
    pub const GENERIC_DESKTOP: u16 = 0x01;
    pub const SIMULATION: u16 = 0x02;
    pub const KEYBOARD: u16 = 0x07;
    pub const BUTTON: u16 = 0x09;
    pub const PHYSICAL_INTERFACE: u16 = 0x0F;
}

/// Generic Desktop usages.
pub mod desktop {
    pub const POINTER: u16 = 0x01;
    pub const MOUSE: u16 = 0x02;
    pub const JOYSTICK: u16 = 0x04;
    pub const GAMEPAD: u16 = 0x05;
    pub const KEYBOARD: u16 = 0x06;
    pub const KEYPAD: u16 = 0x07;
    pub const MULTI_AXIS: u16 = 0x08;
    pub const X: u16 = 0x30;
    pub const Y: u16 = 0x31;
    pub const Z: u16 = 0x32;
    pub const RX: u16 = 0x33;
    pub const RY: u16 = 0x34;
    pub const RZ: u16 = 0x35;
    pub const SLIDER: u16 = 0x36;
    pub const DIAL: u16 = 0x37;
    pub const WHEEL: u16 = 0x38;
    pub const HAT_SWITCH: u16 = 0x39;
}

/// Simulation Controls usages.
pub mod simulation {
    pub const ACCELERATOR: u16 = 0xC4;
    pub const BRAKE: u16 = 0xC5;
    pub const CLUTCH: u16 = 0xC6;
    pub const STEERING: u16 = 0xC8;
    pub const THROTTLE: u16 = 0xBB;
    pub const RUDDER: u16 = 0xBA;
}

/// `true` for the vendor-defined range `0xFF00..=0xFFFF`.
#[inline]
pub fn is_vendor_defined(usage_page: u16) -> bool {
    (usage_page & 0xFF00) == 0xFF00
}

/// Friendly element name for a `(usage_page, usage)` pair.
pub fn usage_name(usage_page: u16, usage: u16) -> String {
    match usage_page {
        page::GENERIC_DESKTOP => {
            let s = match usage {
                desktop::X => "X",
                desktop::Y => "Y",
                desktop::Z => "Z",
                desktop::RX => "Rx",
                desktop::RY => "Ry",
                desktop::RZ => "Rz",
                desktop::SLIDER => "Slider",
                desktop::DIAL => "Dial",
                desktop::WHEEL => "Wheel",
                desktop::HAT_SWITCH => "Hat",
                _ => return format!("GD_{usage:#04x}"),
            };
            s.to_string()
        }
        page::SIMULATION => match usage {
            simulation::ACCELERATOR => "Accelerator".into(),
            simulation::BRAKE => "Brake".into(),
            simulation::CLUTCH => "Clutch".into(),
            simulation::STEERING => "Steering".into(),
            simulation::THROTTLE => "Throttle".into(),
            simulation::RUDDER => "Rudder".into(),
            _ => "Sim".into(),
        },
        page::BUTTON => format!("Button {usage}"),
        page::KEYBOARD => format!("Key {usage:#04x}"),
        p if is_vendor_defined(p) => "Vendor".into(),
        _ => format!("UP_{usage_page:04x}_U_{usage:04x}"),
    }
}

/// Collection-level class name for a top-level `(usage_page, usage)`.
///
/// Returns `None` for collections that are not one of the well-known device
/// classes.
pub fn collection_class(usage_page: u16, usage: u16) -> Option<&'static str> {
    match (usage_page, usage) {
        (page::GENERIC_DESKTOP, desktop::POINTER) | (page::GENERIC_DESKTOP, desktop::MOUSE) => {
            Some("Mouse")
        }
        (page::GENERIC_DESKTOP, desktop::JOYSTICK) => Some("Joystick"),
        (page::GENERIC_DESKTOP, desktop::GAMEPAD) => Some("Gamepad"),
        (page::GENERIC_DESKTOP, desktop::KEYBOARD) | (page::GENERIC_DESKTOP, desktop::KEYPAD) => {
            Some("Keyboard")
        }
        (page::GENERIC_DESKTOP, desktop::MULTI_AXIS) => Some("Multi-axis Controller"),
        (page::SIMULATION, _) => Some("Simulation Device"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_common_axes() {
        assert_eq!(usage_name(page::GENERIC_DESKTOP, desktop::X), "X");
        assert_eq!(usage_name(page::GENERIC_DESKTOP, desktop::HAT_SWITCH), "Hat");
        assert_eq!(usage_name(page::BUTTON, 3), "Button 3");
        assert_eq!(usage_name(0xFF00, 1), "Vendor");
    }

    #[test]
    fn classifies_collections() {
        assert_eq!(
            collection_class(page::GENERIC_DESKTOP, desktop::GAMEPAD),
            Some("Gamepad")
        );
        assert_eq!(collection_class(0x0C, 0x01), None);
    }
}

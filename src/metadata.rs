//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is a lightweight, cloneable description of a bound device suitable
//! for UI display, logging, and persistence. It is produced by
//! [`Device::meta`](crate::device::Device::meta).
//!
//! # Conventions
//! - `usage_page`/`usage` are the top-level collection the device matched under.
//! - `product_string` prefers the OS-reported name and falls back to the usage map
//!   descriptor's display name.
//! - `location` is the transport's opaque handle identity (an OS path for hidapi).
//!
//! ## Persistence notes
//! - `vid`/`pid` are stable and useful for re-identification.
//! - `location` may change across ports, drivers, and reconnects; treat it as
//!   diagnostic first, identity second.
//!
//! # Example
//! ```no_run
//! # #[cfg(feature = "hid")] {
//! use feelhid::{Manager, ManagerConfig};
//!
//! let mgr = Manager::discover(ManagerConfig::default()).expect("discover devices");
//! for device in mgr.devices() {
//!     println!("{}", device.meta());
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of metadata describing a single device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// USB Vendor ID (VID).
    pub vid: u16,

    /// USB Product ID (PID).
    pub pid: u16,

    /// Manufacturer string from the driver/firmware, if present.
    pub manufacturer: Option<String>,

    /// Human-readable product name.
    pub product_string: Option<String>,

    /// HID Usage Page of the matched collection (e.g., `0x01` for Generic Desktop).
    pub usage_page: u16,

    /// HID Usage within the page (e.g., `0x04` Joystick, `0x05` Gamepad).
    pub usage: u16,

    /// Opaque transport location.
    pub location: String,

    /// Classification string (`"Joystick"`, `"Gamepad"`, ...).
    pub device_type: String,

    /// Number of mapped elements.
    pub elements: usize,

    /// An actuator is bound.
    pub force_feedback: bool,
}

impl DeviceMeta {
    /// Serialize for diagnostics dumps.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for DeviceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x} {} [{}] ({} elements{})",
            self.vid,
            self.pid,
            self.product_string.as_deref().unwrap_or("<unnamed>"),
            self.device_type,
            self.elements,
            if self.force_feedback { ", ffb" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_json() {
        let meta = DeviceMeta {
            vid: 0x046d,
            pid: 0xc218,
            product_string: Some("RumblePad".into()),
            usage_page: 1,
            usage: 5,
            location: "virtual:0".into(),
            device_type: "Gamepad".into(),
            elements: 17,
            force_feedback: true,
            ..Default::default()
        };
        assert_eq!(
            meta.to_string(),
            "046d:c218 RumblePad [Gamepad] (17 elements, ffb)"
        );
        let json = meta.to_json().expect("json");
        let back: DeviceMeta = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, meta);
    }
}

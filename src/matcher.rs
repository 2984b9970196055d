//! Device matching.
//!
//! Turns a usage map table into OS subscription criteria and resolves raw OS
//! handles into bound [`Device`]s.
//!
//! Resolution is a two-level scan: the top-level collection `(usage_page, usage)`
//! selects a [`UsageMapEntry`](crate::usage_map::UsageMapEntry), then the
//! `(vendor_id, product_id)` pair selects a descriptor inside it. The first hit in
//! table order wins.

use crate::device::{Device, RawDevice};
use crate::error::{Error, Result};
use crate::usage::{desktop, page, simulation};
use crate::usage_map::{
    ButtonMap, DeviceDescriptor, ElementHandler, ElementKind, ElementMap, UsageMapTable,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// One device-arrival subscription criterion.
///
/// Serializes with the key names OS matching dictionaries use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchCriterion {
    #[serde(rename = "DeviceUsagePage")]
    pub usage_page: u16,
    #[serde(rename = "DeviceUsage")]
    pub usage: u16,
}

impl MatchCriterion {
    #[inline]
    pub fn matches_usage(&self, usage_page: u16, usage: u16) -> bool {
        self.usage_page == usage_page && self.usage == usage
    }

    pub fn matches(&self, raw: &dyn RawDevice) -> bool {
        self.matches_usage(raw.usage_page(), raw.usage())
    }
}

/// Criteria for the built-in table.
pub fn build_match_criteria() -> Vec<MatchCriterion> {
    build_match_criteria_from(UsageMapTable::builtin())
}

/// One criterion per table entry, in table order.
pub fn build_match_criteria_from(table: &UsageMapTable) -> Vec<MatchCriterion> {
    table
        .entries
        .iter()
        .map(|e| MatchCriterion {
            usage_page: e.usage_page,
            usage: e.usage,
        })
        .collect()
}

/// Render criteria as a JSON array of matching dictionaries.
pub fn criteria_to_json(criteria: &[MatchCriterion]) -> Result<String> {
    Ok(serde_json::to_string(criteria)?)
}

/// Resolve a raw handle against `table`.
pub fn resolve(raw: Rc<dyn RawDevice>, table: &UsageMapTable) -> Result<Device> {
    let (vendor_id, product_id) = (raw.vendor_id(), raw.product_id());
    let (usage_page, usage) = (raw.usage_page(), raw.usage());
    let unrecognized = || Error::UnrecognizedDevice {
        vendor_id,
        product_id,
        usage_page,
        usage,
    };

    // Usage page 0 is reserved; a handle reporting it has no readable collection.
    if usage_page == 0 {
        return Err(unrecognized());
    }

    let descriptor = table
        .find_descriptor(usage_page, usage, vendor_id, product_id)
        .ok_or_else(unrecognized)?;

    tracing::debug!(
        vendor_id,
        product_id,
        usage_page,
        usage,
        name = descriptor.name.as_deref().unwrap_or(""),
        "device resolved"
    );
    Ok(Device::bind(raw, (usage_page, usage), descriptor))
}

/// [`resolve`] against the built-in table.
pub fn resolve_default(raw: Rc<dyn RawDevice>) -> Result<Device> {
    resolve(raw, UsageMapTable::builtin())
}

/// Catch-all descriptor for devices no table knows.
///
/// Maps buttons 1..=32, the Generic Desktop axes, the common Simulation controls
/// and one hat. Force feedback follows whatever the transport exposes.
pub fn generic_descriptor(raw: &dyn RawDevice) -> DeviceDescriptor {
    let buttons = (1..=32u16)
        .map(|usage| ButtonMap::new(usage, usage - 1, ElementHandler::Button))
        .collect();

    let mut axes: Vec<ButtonMap> = (desktop::X..=desktop::RZ)
        .zip(0u16..)
        .map(|(usage, index)| ButtonMap::new(usage, index, ElementHandler::Axis))
        .collect();
    axes.push(ButtonMap::new(desktop::SLIDER, 6, ElementHandler::Trigger));
    axes.push(ButtonMap::new(desktop::DIAL, 7, ElementHandler::Trigger));
    axes.push(ButtonMap::new(desktop::WHEEL, 8, ElementHandler::Delta));
    axes.push(ButtonMap::new(simulation::STEERING, 9, ElementHandler::Axis));
    axes.push(ButtonMap::new(simulation::ACCELERATOR, 10, ElementHandler::Trigger));
    axes.push(ButtonMap::new(simulation::BRAKE, 11, ElementHandler::Trigger));
    axes.push(ButtonMap::new(simulation::CLUTCH, 12, ElementHandler::Trigger));

    DeviceDescriptor {
        vendor_id: raw.vendor_id(),
        product_id: raw.product_id(),
        name: raw.product(),
        force_feedback: raw.force_feedback().is_some(),
        elements: vec![
            ElementMap::new(ElementKind::Button, buttons),
            ElementMap::new(ElementKind::Axis, axes),
            ElementMap::new(
                ElementKind::Misc,
                vec![ButtonMap::new(desktop::HAT_SWITCH, 0, ElementHandler::Hat)],
            ),
        ],
    }
}

/// Whether the collection is one the generic descriptor makes sense for.
pub fn is_game_collection(usage_page: u16, usage: u16) -> bool {
    match usage_page {
        page::GENERIC_DESKTOP => matches!(
            usage,
            desktop::JOYSTICK | desktop::GAMEPAD | desktop::MULTI_AXIS
        ),
        page::SIMULATION => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::{VirtualDevice, VirtualForceFeedback};

    #[test]
    fn criteria_follow_table_order() {
        let criteria = build_match_criteria();
        assert_eq!(criteria.len(), UsageMapTable::builtin().len());
        assert_eq!(
            criteria[0],
            MatchCriterion {
                usage_page: page::GENERIC_DESKTOP,
                usage: desktop::JOYSTICK
            }
        );
    }

    #[test]
    fn criteria_json_uses_os_keys() {
        let json = criteria_to_json(&[MatchCriterion {
            usage_page: 1,
            usage: 5,
        }])
        .expect("json");
        assert_eq!(json, r#"[{"DeviceUsagePage":1,"DeviceUsage":5}]"#);
    }

    #[test]
    fn resolves_builtin_model() {
        let raw = Rc::new(VirtualDevice::new(
            0x046d,
            0xc215,
            page::GENERIC_DESKTOP,
            desktop::JOYSTICK,
        ));
        let device = resolve_default(raw).expect("resolve");
        assert_eq!(device.product_name(), "Logitech Extreme 3D Pro");
        assert_eq!(device.device_type(), "Joystick");
        assert!(!device.has_actuator());
    }

    #[test]
    fn wrong_collection_is_unrecognized() {
        // Right vendor/product, but presented under the gamepad collection.
        let raw = Rc::new(VirtualDevice::new(
            0x046d,
            0xc215,
            page::GENERIC_DESKTOP,
            desktop::GAMEPAD,
        ));
        assert!(matches!(
            resolve_default(raw),
            Err(Error::UnrecognizedDevice {
                vendor_id: 0x046d,
                product_id: 0xc215,
                ..
            })
        ));
    }

    #[test]
    fn usage_page_zero_is_malformed() {
        let raw = Rc::new(VirtualDevice::new(0x046d, 0xc215, 0, desktop::JOYSTICK));
        assert!(matches!(
            resolve_default(raw),
            Err(Error::UnrecognizedDevice { usage_page: 0, .. })
        ));
    }

    #[test]
    fn generic_descriptor_tracks_transport() {
        let plain = VirtualDevice::new(0xbeef, 0x0001, page::GENERIC_DESKTOP, desktop::JOYSTICK);
        let desc = generic_descriptor(&plain);
        assert!(!desc.force_feedback);
        assert_eq!(desc.element_count(), 32 + 13 + 1);
        UsageMapTable::new(vec![crate::usage_map::UsageMapEntry {
            usage_page: page::GENERIC_DESKTOP,
            usage: desktop::JOYSTICK,
            devices: vec![desc],
        }])
        .validate()
        .expect("generic descriptor validates");

        let motor = plain.with_force_feedback(Rc::new(VirtualForceFeedback::default()));
        assert!(generic_descriptor(&motor).force_feedback);
    }

    #[test]
    fn game_collections() {
        assert!(is_game_collection(page::GENERIC_DESKTOP, desktop::GAMEPAD));
        assert!(is_game_collection(page::SIMULATION, 0x02));
        assert!(!is_game_collection(page::GENERIC_DESKTOP, desktop::MOUSE));
        assert!(!is_game_collection(0xFF00, 0x01));
    }
}

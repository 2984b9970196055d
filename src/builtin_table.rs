//! Built-in device models.
//!
//! Layouts follow what the devices report through their HID descriptors. Element
//! usages are those of the Button page (buttons) and Generic Desktop page (axes,
//! hat). Vendor diagnostic elements are deliberately left unmapped.

use crate::usage::{desktop, page};
use crate::usage_map::{
    ButtonMap, DeviceDescriptor, ElementHandler, ElementKind, ElementMap, UsageMapEntry,
    UsageMapTable,
};

/// Buttons `1..=count` on the Button page mapped to indices `0..count`.
fn buttons(count: u16) -> ElementMap {
    ElementMap::new(
        ElementKind::Button,
        (1..=count)
            .map(|usage| ButtonMap::new(usage, usage - 1, ElementHandler::Button))
            .collect(),
    )
}

/// Axes in the order given; index = position.
fn axes(list: &[(u16, ElementHandler)]) -> ElementMap {
    ElementMap::new(
        ElementKind::Axis,
        list.iter()
            .zip(0u16..)
            .map(|(&(usage, handler), index)| ButtonMap::new(usage, index, handler))
            .collect(),
    )
}

fn hat() -> ElementMap {
    ElementMap::new(
        ElementKind::Misc,
        vec![ButtonMap::new(desktop::HAT_SWITCH, 0, ElementHandler::Hat)],
    )
}

fn model(
    vendor_id: u16,
    product_id: u16,
    name: &str,
    force_feedback: bool,
    elements: Vec<ElementMap>,
) -> DeviceDescriptor {
    DeviceDescriptor {
        vendor_id,
        product_id,
        name: Some(name.to_string()),
        force_feedback,
        elements,
    }
}

const STICK_AXES: &[(u16, ElementHandler)] = &[
    (desktop::X, ElementHandler::Axis),
    (desktop::Y, ElementHandler::Axis),
    (desktop::RZ, ElementHandler::Axis),
    (desktop::SLIDER, ElementHandler::Trigger),
];

const PAD_AXES: &[(u16, ElementHandler)] = &[
    (desktop::X, ElementHandler::Axis),
    (desktop::Y, ElementHandler::Axis),
    (desktop::Z, ElementHandler::Axis),
    (desktop::RZ, ElementHandler::Axis),
];

const XBOX_AXES: &[(u16, ElementHandler)] = &[
    (desktop::X, ElementHandler::Axis),
    (desktop::Y, ElementHandler::Axis),
    (desktop::RX, ElementHandler::Axis),
    (desktop::RY, ElementHandler::Axis),
    (desktop::Z, ElementHandler::Trigger),
    (desktop::RZ, ElementHandler::Trigger),
];

const SIX_DOF_AXES: &[(u16, ElementHandler)] = &[
    (desktop::X, ElementHandler::Axis),
    (desktop::Y, ElementHandler::Axis),
    (desktop::Z, ElementHandler::Axis),
    (desktop::RX, ElementHandler::Axis),
    (desktop::RY, ElementHandler::Axis),
    (desktop::RZ, ElementHandler::Axis),
];

pub(crate) fn build() -> UsageMapTable {
    UsageMapTable::new(vec![
        UsageMapEntry {
            usage_page: page::GENERIC_DESKTOP,
            usage: desktop::JOYSTICK,
            devices: vec![
                model(
                    0x046d,
                    0xc215,
                    "Logitech Extreme 3D Pro",
                    false,
                    vec![buttons(12), axes(STICK_AXES), hat()],
                ),
                model(
                    0x046d,
                    0xc283,
                    "Logitech WingMan Force 3D",
                    true,
                    vec![buttons(9), axes(STICK_AXES), hat()],
                ),
                model(
                    0x045e,
                    0x001b,
                    "Microsoft SideWinder Force Feedback 2",
                    true,
                    vec![buttons(8), axes(STICK_AXES), hat()],
                ),
            ],
        },
        UsageMapEntry {
            usage_page: page::GENERIC_DESKTOP,
            usage: desktop::GAMEPAD,
            devices: vec![
                model(
                    0x046d,
                    0xc216,
                    "Logitech Dual Action",
                    false,
                    vec![buttons(12), axes(PAD_AXES), hat()],
                ),
                model(
                    0x046d,
                    0xc218,
                    "Logitech RumblePad 2 USB",
                    true,
                    vec![buttons(12), axes(PAD_AXES), hat()],
                ),
                model(
                    0x045e,
                    0x028e,
                    "Xbox 360 Controller",
                    true,
                    vec![buttons(15), axes(XBOX_AXES)],
                ),
            ],
        },
        UsageMapEntry {
            usage_page: page::GENERIC_DESKTOP,
            usage: desktop::MULTI_AXIS,
            devices: vec![model(
                0x046d,
                0xc626,
                "3Dconnexion SpaceNavigator",
                false,
                vec![buttons(2), axes(SIX_DOF_AXES)],
            )],
        },
    ])
}

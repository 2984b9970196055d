//! Raw element values and classified events.
//!
//! Transports deliver [`RawValue`]s: one value of one HID element, tagged with the
//! element it came from. A [`Device`](crate::device::Device) classifies those through
//! its usage map bindings and pushes [`HidEvent`]s upward.
//!
//! ## Value conventions
//! - **Axes:** `AxisMoved` values are normalized to `[-1.0, 1.0]`, or `[0.0, 1.0]`
//!   for elements bound with the `Trigger` handler.
//! - **Relative motion:** `AxisDelta` carries raw counts as reported by the device.
//! - **Buttons / keys:** press/release edges only; repeats of the same state are dropped.
//! - **Hats (POV/D-pad):** `-1` = neutral, `0..7` = 8-way directions (Up = 0, clockwise).

use crate::device::DeviceId;
use crate::usage_map::ElementKind;
use std::time::Instant;

/// The element a raw value originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementRef {
    pub kind: ElementKind,
    /// Descriptor logical range, used for normalization.
    pub logical_min: i32,
    pub logical_max: i32,
    /// Transport-specific element identity (field position for decoded reports).
    pub cookie: u32,
}

impl ElementRef {
    pub fn new(kind: ElementKind, logical_min: i32, logical_max: i32) -> Self {
        Self {
            kind,
            logical_min,
            logical_max,
            cookie: 0,
        }
    }
}

/// One value of one element, as delivered by the OS.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawValue {
    pub usage_page: u16,
    pub usage: u16,
    pub value: i32,
    pub element: ElementRef,
}

impl RawValue {
    pub fn new(usage_page: u16, usage: u16, value: i32, element: ElementRef) -> Self {
        Self {
            usage_page,
            usage,
            value,
            element,
        }
    }
}

/// Classified input change.
#[derive(Clone, Debug, PartialEq)]
pub enum InputKind {
    ButtonPressed,
    ButtonReleased,
    /// Absolute axis position (see module docs for ranges).
    AxisMoved { value: f32 },
    /// Relative motion in device counts.
    AxisDelta { delta: i32 },
    /// `-1` = neutral, `0..7` = directions.
    HatChanged { value: i16 },
    /// Keyboard usage went down.
    KeyPressed { key: u16 },
    KeyReleased { key: u16 },
}

/// Timestamped event pushed from a device to its delegate.
#[derive(Clone, Debug)]
pub struct HidEvent {
    pub device: DeviceId,
    /// Capture time (monotonic).
    pub at: Instant,
    /// Logical index from the bound [`ButtonMap`](crate::usage_map::ButtonMap).
    pub index: u16,
    /// Usage of the element that produced the event.
    pub usage: u16,
    pub kind: InputKind,
}

impl HidEvent {
    #[inline]
    pub fn is_button(&self) -> bool {
        matches!(
            self.kind,
            InputKind::ButtonPressed | InputKind::ButtonReleased
        )
    }

    #[inline]
    pub fn is_axis(&self) -> bool {
        matches!(
            self.kind,
            InputKind::AxisMoved { .. } | InputKind::AxisDelta { .. }
        )
    }
}

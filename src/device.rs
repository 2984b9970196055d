//! Connected devices.
//!
//! A [`Device`] is created by the [matcher](crate::matcher) once a raw OS handle has
//! been resolved against a usage map table. It owns the bindings resolved from the
//! matched [`DeviceDescriptor`], classifies incoming [`RawValue`]s through them and
//! pushes the resulting [`HidEvent`]s to its delegate.
//!
//! ## Identity
//! [`DeviceId`] is `vendor:product@location`. The location is whatever opaque
//! string the transport uses for the handle (an OS path for hidapi, a caller
//! chosen name for virtual devices). It is stable for the lifetime of the
//! connection, not across reconnects.
//!
//! ## Threading
//! Devices are `!Send`: they must be driven from the thread that owns the HID
//! event source. Handlers never block.

use crate::actuator::{Actuator, ForceFeedback};
use crate::error::Result;
use crate::event::{ElementRef, HidEvent, InputKind, RawValue};
use crate::manager::DeviceDelegate;
use crate::metadata::DeviceMeta;
use crate::report::{hat_value_to_slot, normalize_axis, normalize_trigger};
use crate::usage;
use crate::usage_map::{ButtonMap, DeviceDescriptor, ElementHandler, ElementKind, ElementMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

/// Transport-side view of one OS device handle.
///
/// Implemented by the backends; the core never talks to the OS directly.
pub trait RawDevice {
    fn vendor_id(&self) -> u16;
    fn product_id(&self) -> u16;
    /// Top-level collection usage page.
    fn usage_page(&self) -> u16;
    /// Top-level collection usage.
    fn usage(&self) -> u16;
    /// Opaque, connection-stable handle identity.
    fn location(&self) -> String;

    fn manufacturer(&self) -> Option<String> {
        None
    }

    fn product(&self) -> Option<String> {
        None
    }

    /// Drain pending element values. Push-based transports leave this empty.
    fn poll_values(&self, _out: &mut Vec<RawValue>) -> Result<()> {
        Ok(())
    }

    /// Force-feedback transport, if the hardware exposes one.
    fn force_feedback(&self) -> Option<Rc<dyn ForceFeedback>> {
        None
    }
}

/// Stable per-connection identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId {
    pub vendor_id: u16,
    pub product_id: u16,
    pub location: String,
}

impl DeviceId {
    pub fn of(raw: &dyn RawDevice) -> Self {
        Self {
            vendor_id: raw.vendor_id(),
            product_id: raw.product_id(),
            location: raw.location(),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:04x}@{}",
            self.vendor_id, self.product_id, self.location
        )
    }
}

/// Lifecycle of a bound device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Active,
    /// The OS reported removal. Input is ignored from here on.
    Retired,
}

pub struct Device {
    id: DeviceId,
    raw: Rc<dyn RawDevice>,
    collection: (u16, u16),
    descriptor: DeviceDescriptor,
    bindings: HashMap<(ElementKind, u16), ButtonMap>,
    actuator: Option<Actuator>,
    delegate: Option<Weak<dyn DeviceDelegate>>,
    state: DeviceState,

    // Edge/coalesce state, cleared by flush().
    pressed_buttons: BTreeSet<u16>,
    held_keys: BTreeSet<u16>,
    last_axis: HashMap<u16, f32>,
    last_hat: HashMap<u16, i16>,

    scratch: Vec<RawValue>,
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("collection", &self.collection)
            .field("state", &self.state)
            .field("elements", &self.bindings.len())
            .field("actuator", &self.actuator.is_some())
            .finish()
    }
}

impl Device {
    /// Bind a raw handle to a descriptor.
    ///
    /// `collection` is the usage map entry the descriptor was found under. When the
    /// descriptor declares force feedback an [`Actuator`] is attached; a transport
    /// without force-feedback support simply leaves the device without one.
    pub fn bind(
        raw: Rc<dyn RawDevice>,
        collection: (u16, u16),
        descriptor: &DeviceDescriptor,
    ) -> Self {
        let mut bindings = HashMap::new();
        for map in &descriptor.elements {
            for b in &map.buttons {
                bindings.entry((map.kind, b.usage)).or_insert_with(|| b.clone());
            }
        }

        let mut device = Self {
            id: DeviceId::of(raw.as_ref()),
            raw,
            collection,
            descriptor: descriptor.clone(),
            bindings,
            actuator: None,
            delegate: None,
            state: DeviceState::Active,
            pressed_buttons: BTreeSet::new(),
            held_keys: BTreeSet::new(),
            last_axis: HashMap::new(),
            last_hat: HashMap::new(),
            scratch: Vec::new(),
        };

        if descriptor.force_feedback {
            match Actuator::new(&device) {
                Ok(actuator) => device.actuator = Some(actuator),
                Err(e) => tracing::warn!(device = %device.id, error = %e, "actuator unavailable"),
            }
        }

        tracing::debug!(
            device = %device.id,
            class = %device.device_type(),
            elements = device.element_count(),
            actuator = device.actuator.is_some(),
            "device bound"
        );
        device
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn vendor_id(&self) -> u16 {
        self.id.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.id.product_id
    }

    pub fn location(&self) -> &str {
        &self.id.location
    }

    /// OS-reported manufacturer, or empty.
    pub fn vendor_name(&self) -> String {
        self.raw.manufacturer().unwrap_or_default()
    }

    /// OS-reported product name, falling back to the descriptor's name, or empty.
    pub fn product_name(&self) -> String {
        self.raw
            .product()
            .or_else(|| self.descriptor.name.clone())
            .unwrap_or_default()
    }

    /// Classification string.
    ///
    /// The collection the device matched under decides first (Joystick, Gamepad,
    /// ...). Collections outside the well-known classes are classified from the
    /// element type tags of the bound element maps.
    pub fn device_type(&self) -> String {
        if let Some(class) = usage::collection_class(self.collection.0, self.collection.1) {
            return class.to_string();
        }
        let has = |kind| self.descriptor.elements.iter().any(|m| m.kind == kind);
        let class = if has(ElementKind::ScanCodes) {
            "Keyboard"
        } else if has(ElementKind::Axis) {
            "Axis Controller"
        } else if has(ElementKind::Button) {
            "Button Controller"
        } else {
            "Generic Device"
        };
        class.to_string()
    }

    /// Top-level collection `(usage_page, usage)` this device matched under.
    pub fn collection(&self) -> (u16, u16) {
        self.collection
    }

    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    pub fn raw(&self) -> &Rc<dyn RawDevice> {
        &self.raw
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn has_actuator(&self) -> bool {
        self.actuator.is_some()
    }

    pub fn actuator(&self) -> Option<&Actuator> {
        self.actuator.as_ref()
    }

    pub fn actuator_mut(&mut self) -> Option<&mut Actuator> {
        self.actuator.as_mut()
    }

    /// Replace the (non-owning) delegate. `None` detaches.
    pub fn set_delegate(&mut self, delegate: Option<&Rc<dyn DeviceDelegate>>) {
        self.delegate = delegate.map(Rc::downgrade);
    }

    pub fn element_map(&self) -> &[ElementMap] {
        &self.descriptor.elements
    }

    pub fn element_count(&self) -> usize {
        self.descriptor.element_count()
    }

    /// Pull pending values from the transport and dispatch them.
    pub fn poll(&mut self) {
        if self.state == DeviceState::Retired {
            return;
        }
        let mut values = std::mem::take(&mut self.scratch);
        values.clear();
        if let Err(e) = self.raw.poll_values(&mut values) {
            tracing::warn!(device = %self.id, error = %e, "read failed");
        }
        for value in &values {
            self.handle_input(value);
        }
        self.scratch = values;
    }

    /// Classify one raw value through the bound element map.
    ///
    /// Elements without a binding (unused usages) are ignored, as is anything on a
    /// vendor-defined page: bindings carry no page, so a vendor diagnostic usage
    /// must not alias a standard one.
    pub fn handle_input(&mut self, value: &RawValue) {
        if self.state == DeviceState::Retired {
            return;
        }
        if usage::is_vendor_defined(value.usage_page) {
            tracing::trace!(
                device = %self.id,
                usage_page = value.usage_page,
                usage = value.usage,
                "vendor element"
            );
            return;
        }
        let Some(binding) = self.bindings.get(&(value.element.kind, value.usage)) else {
            tracing::trace!(
                device = %self.id,
                kind = ?value.element.kind,
                usage_page = value.usage_page,
                usage = value.usage,
                "unmapped element"
            );
            return;
        };
        let (handler, index, usage) = (binding.handler, binding.index, binding.usage);
        match handler {
            ElementHandler::Button => self.on_button(index, usage, value.value),
            ElementHandler::Axis => self.on_axis(index, usage, value.value, &value.element, false),
            ElementHandler::Trigger => {
                self.on_axis(index, usage, value.value, &value.element, true)
            }
            ElementHandler::Delta => self.on_delta(index, usage, value.value),
            ElementHandler::Hat => self.on_hat(index, usage, value.value, &value.element),
            ElementHandler::Key => self.on_key(index, usage, value.value),
        }
    }

    /// Forward a classified event to the delegate, if it is still alive.
    pub fn push_event(&self, event: HidEvent) {
        if let Some(delegate) = self.delegate.as_ref().and_then(Weak::upgrade) {
            delegate.receive(&event);
        }
    }

    /// Drop latched and cached element state.
    ///
    /// Held buttons and keys are released through the delegate first, so consumers
    /// never keep a control stuck down across focus loss or reconnects.
    pub fn flush(&mut self) {
        let buttons = std::mem::take(&mut self.pressed_buttons);
        for index in buttons {
            let usage = self.usage_for(ElementHandler::Button, index);
            self.emit(index, usage, InputKind::ButtonReleased);
        }
        let keys = std::mem::take(&mut self.held_keys);
        for key in keys {
            let index = self.index_for_key(key);
            self.emit(index, key, InputKind::KeyReleased { key });
        }
        self.last_axis.clear();
        self.last_hat.clear();
    }

    /// Mark the device removed: release latches, silence the motor, ignore input.
    pub fn retire(&mut self) {
        if self.state == DeviceState::Retired {
            return;
        }
        self.flush();
        if let Some(actuator) = self.actuator.as_mut() {
            actuator.stop();
        }
        self.state = DeviceState::Retired;
        tracing::debug!(device = %self.id, "device retired");
    }

    /// Snapshot for UI / diagnostics.
    pub fn meta(&self) -> DeviceMeta {
        DeviceMeta {
            vid: self.vendor_id(),
            pid: self.product_id(),
            manufacturer: self.raw.manufacturer(),
            product_string: Some(self.product_name()).filter(|s| !s.is_empty()),
            usage_page: self.collection.0,
            usage: self.collection.1,
            location: self.id.location.clone(),
            device_type: self.device_type(),
            elements: self.element_count(),
            force_feedback: self.has_actuator(),
        }
    }

    // --------------------- handlers ---------------------

    fn emit(&self, index: u16, usage: u16, kind: InputKind) {
        self.push_event(HidEvent {
            device: self.id.clone(),
            at: Instant::now(),
            index,
            usage,
            kind,
        });
    }

    fn on_button(&mut self, index: u16, usage: u16, raw: i32) {
        if raw != 0 {
            if self.pressed_buttons.insert(index) {
                self.emit(index, usage, InputKind::ButtonPressed);
            }
        } else if self.pressed_buttons.remove(&index) {
            self.emit(index, usage, InputKind::ButtonReleased);
        }
    }

    fn on_axis(&mut self, index: u16, usage: u16, raw: i32, element: &ElementRef, trigger: bool) {
        let value = if trigger {
            normalize_trigger(raw, element.logical_min, element.logical_max)
        } else {
            normalize_axis(raw, element.logical_min, element.logical_max)
        };
        let changed = self
            .last_axis
            .get(&index)
            .map_or(true, |last| (last - value).abs() > f32::EPSILON);
        if changed {
            self.last_axis.insert(index, value);
            self.emit(index, usage, InputKind::AxisMoved { value });
        }
    }

    fn on_delta(&mut self, index: u16, usage: u16, raw: i32) {
        if raw != 0 {
            self.emit(index, usage, InputKind::AxisDelta { delta: raw });
        }
    }

    fn on_hat(&mut self, index: u16, usage: u16, raw: i32, element: &ElementRef) {
        let value = hat_value_to_slot(raw, element.logical_min, element.logical_max);
        if self.last_hat.insert(index, value) != Some(value) {
            self.emit(index, usage, InputKind::HatChanged { value });
        }
    }

    fn on_key(&mut self, index: u16, key: u16, raw: i32) {
        if raw != 0 {
            if self.held_keys.insert(key) {
                self.emit(index, key, InputKind::KeyPressed { key });
            }
        } else if self.held_keys.remove(&key) {
            self.emit(index, key, InputKind::KeyReleased { key });
        }
    }

    fn usage_for(&self, handler: ElementHandler, index: u16) -> u16 {
        self.bindings
            .values()
            .find(|b| b.handler == handler && b.index == index)
            .map_or(0, |b| b.usage)
    }

    fn index_for_key(&self, key: u16) -> u16 {
        self.bindings
            .values()
            .find(|b| b.handler == ElementHandler::Key && b.usage == key)
            .map_or(0, |b| b.index)
    }
}

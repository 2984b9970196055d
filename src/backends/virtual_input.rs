//! Scriptable in-memory backend.
//!
//! [`VirtualDevice`] is a [`RawDevice`] whose values are queued by the caller and
//! handed out on the next poll. [`VirtualForceFeedback`] records every command it
//! receives and can be unplugged to make the transport reject commands.
//!
//! Used by the tests and by hosts that replay recorded input.

use crate::actuator::{ForceFeedback, RumbleEffect};
use crate::device::RawDevice;
use crate::error::{Error, Result};
use crate::event::{ElementRef, RawValue};
use crate::usage::{desktop, page};
use crate::usage_map::ElementKind;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

pub struct VirtualDevice {
    vendor_id: u16,
    product_id: u16,
    usage_page: u16,
    usage: u16,
    location: String,
    manufacturer: Option<String>,
    product: Option<String>,
    pending: RefCell<VecDeque<RawValue>>,
    force_feedback: Option<Rc<VirtualForceFeedback>>,
}

impl VirtualDevice {
    /// A device presenting the top-level collection `(usage_page, usage)`.
    ///
    /// The location defaults to `virtual:{vendor:04x}:{product:04x}`.
    pub fn new(vendor_id: u16, product_id: u16, usage_page: u16, usage: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            usage_page,
            usage,
            location: format!("virtual:{vendor_id:04x}:{product_id:04x}"),
            manufacturer: None,
            product: None,
            pending: RefCell::new(VecDeque::new()),
            force_feedback: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_names(mut self, manufacturer: &str, product: &str) -> Self {
        self.manufacturer = Some(manufacturer.to_string());
        self.product = Some(product.to_string());
        self
    }

    pub fn with_force_feedback(mut self, ffb: Rc<VirtualForceFeedback>) -> Self {
        self.force_feedback = Some(ffb);
        self
    }

    /// Queue a raw value for the next poll.
    pub fn push_value(&self, value: RawValue) {
        self.pending.borrow_mut().push_back(value);
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Button page usage goes down.
    pub fn press(&self, usage: u16) {
        self.push_value(button(usage, 1));
    }

    pub fn release(&self, usage: u16) {
        self.push_value(button(usage, 0));
    }

    /// Generic Desktop axis value over the logical range `min..=max`.
    pub fn set_axis(&self, usage: u16, value: i32, min: i32, max: i32) {
        self.push_value(RawValue::new(
            page::GENERIC_DESKTOP,
            usage,
            value,
            ElementRef::new(ElementKind::Axis, min, max),
        ));
    }

    /// Hat switch value; anything outside `min..=max` is neutral.
    pub fn set_hat(&self, value: i32, min: i32, max: i32) {
        self.push_value(RawValue::new(
            page::GENERIC_DESKTOP,
            desktop::HAT_SWITCH,
            value,
            ElementRef::new(ElementKind::Misc, min, max),
        ));
    }

    /// Keyboard page usage edge.
    pub fn key(&self, usage: u16, down: bool) {
        self.push_value(RawValue::new(
            page::KEYBOARD,
            usage,
            i32::from(down),
            ElementRef::new(ElementKind::ScanCodes, 0, 1),
        ));
    }
}

fn button(usage: u16, value: i32) -> RawValue {
    RawValue::new(
        page::BUTTON,
        usage,
        value,
        ElementRef::new(ElementKind::Button, 0, 1),
    )
}

impl RawDevice for VirtualDevice {
    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.product_id
    }

    fn usage_page(&self) -> u16 {
        self.usage_page
    }

    fn usage(&self) -> u16 {
        self.usage
    }

    fn location(&self) -> String {
        self.location.clone()
    }

    fn manufacturer(&self) -> Option<String> {
        self.manufacturer.clone()
    }

    fn product(&self) -> Option<String> {
        self.product.clone()
    }

    fn poll_values(&self, out: &mut Vec<RawValue>) -> Result<()> {
        out.extend(self.pending.borrow_mut().drain(..));
        Ok(())
    }

    fn force_feedback(&self) -> Option<Rc<dyn ForceFeedback>> {
        self.force_feedback
            .clone()
            .map(|ffb| ffb as Rc<dyn ForceFeedback>)
    }
}

/// A command seen by [`VirtualForceFeedback`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FfbCommand {
    Play(RumbleEffect),
    Halt,
}

/// Recording force-feedback transport.
#[derive(Debug, Default)]
pub struct VirtualForceFeedback {
    commands: RefCell<Vec<FfbCommand>>,
    unplugged: Cell<bool>,
}

impl VirtualForceFeedback {
    /// Accepted commands, oldest first.
    pub fn commands(&self) -> Vec<FfbCommand> {
        self.commands.borrow().clone()
    }

    pub fn clear(&self) {
        self.commands.borrow_mut().clear();
    }

    /// Reject every command until [`reconnect`](Self::reconnect).
    pub fn disconnect(&self) {
        self.unplugged.set(true);
    }

    pub fn reconnect(&self) {
        self.unplugged.set(false);
    }

    fn record(&self, command: FfbCommand) -> Result<()> {
        if self.unplugged.get() {
            return Err(Error::TransportRejected("device unplugged".into()));
        }
        self.commands.borrow_mut().push(command);
        Ok(())
    }
}

impl ForceFeedback for VirtualForceFeedback {
    fn play(&self, effect: &RumbleEffect) -> Result<()> {
        self.record(FfbCommand::Play(*effect))
    }

    fn halt(&self) -> Result<()> {
        self.record(FfbCommand::Halt)
    }
}

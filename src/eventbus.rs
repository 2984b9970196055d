//! Optional fan-out of drained events to registered listeners.

use crate::device::DeviceId;
use crate::event::{HidEvent, InputKind};
use std::collections::BTreeMap;

/// Trait for reacting to classified events from any device.
pub trait InputListener {
    fn on_input(&mut self, event: &HidEvent);
}

impl<F: FnMut(&HidEvent)> InputListener for F {
    fn on_input(&mut self, event: &HidEvent) {
        self(event)
    }
}

/// Determines which kinds of events a listener wants to receive.
#[derive(Debug, Clone, Copy)]
pub enum EventFilter {
    All,
    AxisOnly,
    ButtonsOnly,
    HatsOnly,
    KeysOnly,
    Custom(fn(&HidEvent) -> bool),
}

impl EventFilter {
    pub fn accepts(&self, event: &HidEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::AxisOnly => event.is_axis(),
            EventFilter::ButtonsOnly => event.is_button(),
            EventFilter::HatsOnly => matches!(event.kind, InputKind::HatChanged { .. }),
            EventFilter::KeysOnly => matches!(
                event.kind,
                InputKind::KeyPressed { .. } | InputKind::KeyReleased { .. }
            ),
            EventFilter::Custom(f) => f(event),
        }
    }
}

/// Listener with filters and control flags.
struct ListenerEntry {
    listener: Box<dyn InputListener>,
    enabled: bool,
    filter: EventFilter,
    /// Only events from this device, when set.
    device: Option<DeviceId>,
}

#[derive(Default)]
pub struct InputEventBus {
    next_id: u64,
    // Ordered so listeners run in registration order.
    listeners: BTreeMap<u64, ListenerEntry>,
}

impl InputEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener with optional filtering and device restriction.
    pub fn add_listener(
        &mut self,
        listener: impl InputListener + 'static,
        filter: EventFilter,
        device: Option<DeviceId>,
    ) -> u64 {
        let id = self.next_id;
        self.listeners.insert(
            id,
            ListenerEntry {
                listener: Box::new(listener),
                enabled: true,
                filter,
                device,
            },
        );
        self.next_id += 1;
        id
    }

    /// Enables a previously registered listener.
    pub fn enable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = true;
        }
    }

    /// Disables (mutes) a listener without removing it.
    pub fn disable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = false;
        }
    }

    /// Unregisters a listener entirely.
    pub fn remove_listener(&mut self, id: u64) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Emits one event to all active and matching listeners.
    pub fn emit(&mut self, event: &HidEvent) {
        for entry in self.listeners.values_mut() {
            if !entry.enabled {
                continue;
            }
            if entry.device.as_ref().is_some_and(|d| *d != event.device) {
                continue;
            }
            if entry.filter.accepts(event) {
                entry.listener.on_input(event);
            }
        }
    }

    /// Emits a batch of events to matching listeners.
    pub fn emit_all(&mut self, events: &[HidEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

//! Device lifecycle and event collection.
//!
//! The [`Manager`] owns every bound [`Device`] and is the delegate they push
//! classified events to. Devices only hold a weak reference to the manager's
//! [`EventQueue`], so a device that outlives it (or is detached) pushes into the
//! void instead of keeping the queue alive.
//!
//! ## Game loop
//! ```no_run
//! # #[cfg(feature = "hid")] {
//! use feelhid::{Manager, ManagerConfig};
//!
//! let mut mgr = Manager::discover(ManagerConfig::default()).expect("discover devices");
//! loop {
//!     for ev in mgr.poll_events() {
//!         println!("{}: {:?}", ev.device, ev.kind);
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(5));
//! }
//! # }
//! ```
//!
//! ## Hotplug
//! hidapi has no arrival notifications; call [`Manager::refresh`] periodically to
//! attach new matching devices and retire vanished ones.

use crate::config::{FallbackPolicy, ManagerConfig};
use crate::device::{Device, DeviceId, RawDevice};
use crate::error::{Error, Result};
use crate::event::{HidEvent, RawValue};
use crate::eventbus::InputEventBus;
use crate::matcher::{self, MatchCriterion};
use crate::usage_map::UsageMapTable;
use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;

/// Receiver of classified events pushed by a [`Device`].
///
/// Called synchronously from within [`Device::push_event`]; implementations must
/// not block.
pub trait DeviceDelegate {
    fn receive(&self, event: &HidEvent);
}

/// Default [`EventQueue`] capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Bounded FIFO delegate. When full, the oldest event is dropped.
#[derive(Debug)]
pub struct EventQueue {
    events: RefCell<VecDeque<HidEvent>>,
    capacity: usize,
    dropped: Cell<u64>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

impl EventQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: RefCell::new(VecDeque::new()),
            capacity: capacity.max(1),
            dropped: Cell::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }

    /// Take everything queued, oldest first.
    pub fn drain(&self) -> Vec<HidEvent> {
        self.events.borrow_mut().drain(..).collect()
    }
}

impl DeviceDelegate for EventQueue {
    fn receive(&self, event: &HidEvent) {
        let mut events = self.events.borrow_mut();
        if events.len() >= self.capacity {
            events.pop_front();
            self.dropped.set(self.dropped.get() + 1);
        }
        events.push_back(event.clone());
    }
}

pub struct Manager {
    config: ManagerConfig,
    table: UsageMapTable,
    criteria: Vec<MatchCriterion>,
    devices: Vec<Device>,
    queue: Rc<EventQueue>,
    /// Locations attached through [`Manager::refresh`]; only these are pruned by it.
    hid_locations: HashSet<String>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("entries", &self.table.len())
            .field("devices", &self.devices)
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl Manager {
    /// Build the usage map table described by `config` and start with no devices.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        let table = config.build_table()?;
        Ok(Self::with_table(table, config))
    }

    /// Use an explicit table. `config.use_builtin_table`/`tables`/`extra` are ignored.
    pub fn with_table(table: UsageMapTable, config: ManagerConfig) -> Self {
        let criteria = matcher::build_match_criteria_from(&table);
        let queue = Rc::new(EventQueue::with_capacity(config.queue_capacity));
        tracing::debug!(
            entries = table.len(),
            fallback = ?config.fallback,
            "manager ready"
        );
        Self {
            config,
            table,
            criteria,
            devices: Vec::new(),
            queue,
            hid_locations: HashSet::new(),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn table(&self) -> &UsageMapTable {
        &self.table
    }

    /// Subscription criteria for the active table.
    pub fn match_criteria(&self) -> &[MatchCriterion] {
        &self.criteria
    }

    /// Device arrival.
    ///
    /// Returns the new device's id, or `None` when the handle was ignored (already
    /// attached, or unrecognized under [`FallbackPolicy::Ignore`]).
    pub fn attach(&mut self, raw: Rc<dyn RawDevice>) -> Result<Option<DeviceId>> {
        let id = DeviceId::of(raw.as_ref());
        if self.devices.iter().any(|d| d.location() == id.location) {
            tracing::debug!(device = %id, "already attached");
            return Ok(None);
        }

        let mut device = match matcher::resolve(raw.clone(), &self.table) {
            Ok(device) => device,
            Err(e @ Error::UnrecognizedDevice { .. }) => {
                let (usage_page, usage) = (raw.usage_page(), raw.usage());
                let generic = self.config.fallback == FallbackPolicy::Generic
                    && matcher::is_game_collection(usage_page, usage);
                if !generic {
                    tracing::warn!(device = %id, error = %e, "ignoring device");
                    return Ok(None);
                }
                tracing::debug!(device = %id, "binding generic descriptor");
                let descriptor = matcher::generic_descriptor(raw.as_ref());
                Device::bind(raw, (usage_page, usage), &descriptor)
            }
            Err(e) => return Err(e),
        };

        let delegate: Rc<dyn DeviceDelegate> = self.queue.clone();
        device.set_delegate(Some(&delegate));
        tracing::debug!(device = %id, class = %device.device_type(), "device attached");
        self.devices.push(device);
        Ok(Some(id))
    }

    /// Device removal: release latches, stop the actuator and drop the device.
    ///
    /// Returns `false` if no such device is attached.
    pub fn detach(&mut self, id: &DeviceId) -> bool {
        let Some(pos) = self.devices.iter().position(|d| d.id() == id) else {
            return false;
        };
        let mut device = self.devices.remove(pos);
        device.retire();
        self.hid_locations.remove(device.location());
        tracing::debug!(device = %id, "device detached");
        true
    }

    /// Route one raw value to its device (push-based transports).
    pub fn handle_input(&mut self, id: &DeviceId, value: &RawValue) -> bool {
        match self.device_mut(id) {
            Some(device) => {
                device.handle_input(value);
                true
            }
            None => false,
        }
    }

    /// Pump every device's transport, then drain the event queue.
    pub fn poll_events(&mut self) -> Vec<HidEvent> {
        for device in &mut self.devices {
            device.poll();
        }
        self.queue.drain()
    }

    /// Drain without pumping transports.
    pub fn take_events(&self) -> Vec<HidEvent> {
        self.queue.drain()
    }

    /// Poll and fan the events out to `bus`. Returns the number of events.
    pub fn dispatch(&mut self, bus: &mut InputEventBus) -> usize {
        let events = self.poll_events();
        bus.emit_all(&events);
        events.len()
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: &DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id() == id)
    }

    pub fn device_mut(&mut self, id: &DeviceId) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.id() == id)
    }

    /// Focus loss: release everything held on every device.
    pub fn flush_all(&mut self) {
        for device in &mut self.devices {
            device.flush();
        }
    }

    pub fn stop_all_actuators(&mut self) {
        for actuator in self.devices.iter_mut().filter_map(Device::actuator_mut) {
            actuator.stop();
        }
    }

    /// Events lost to a full queue since creation.
    pub fn dropped_events(&self) -> u64 {
        self.queue.dropped()
    }

    /// Enumerate HID devices and attach every match.
    #[cfg(feature = "hid")]
    #[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
    pub fn discover(config: ManagerConfig) -> Result<Self> {
        let mut api = hidapi::HidApi::new()?;
        let mut manager = Self::new(config)?;
        manager.refresh(&mut api)?;
        Ok(manager)
    }

    /// Re-enumerate: attach newly matching devices, retire vanished ones.
    #[cfg(feature = "hid")]
    #[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
    pub fn refresh(&mut self, api: &mut hidapi::HidApi) -> Result<()> {
        api.refresh_devices()?;

        let present: HashSet<String> = api
            .device_list()
            .map(|info| info.path().to_string_lossy().into_owned())
            .collect();
        let gone: Vec<DeviceId> = self
            .devices
            .iter()
            .filter(|d| self.hid_locations.contains(d.location()) && !present.contains(d.location()))
            .map(|d| d.id().clone())
            .collect();
        for id in &gone {
            self.detach(id);
        }

        let known: HashSet<String> = self
            .devices
            .iter()
            .map(|d| d.location().to_string())
            .collect();
        let generic = self.config.fallback == FallbackPolicy::Generic;
        let criteria = &self.criteria;
        let fresh = crate::backends::hid::probe_devices(
            api,
            |info| {
                let (usage_page, usage) = (info.usage_page(), info.usage());
                !known.contains(&*info.path().to_string_lossy())
                    && (criteria.iter().any(|c| c.matches_usage(usage_page, usage))
                        || (generic && matcher::is_game_collection(usage_page, usage)))
            },
            self.config.max_reports_per_tick,
        );

        for raw in fresh {
            let location = raw.location();
            match self.attach(raw) {
                Ok(Some(_)) => {
                    self.hid_locations.insert(location);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(location = %location, error = %e, "attach failed"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::{FfbCommand, VirtualDevice, VirtualForceFeedback};
    use crate::event::InputKind;
    use crate::usage::{desktop, page};

    fn rumble_pad() -> (Rc<VirtualDevice>, Rc<VirtualForceFeedback>) {
        let ffb = Rc::new(VirtualForceFeedback::default());
        let raw = VirtualDevice::new(0x046d, 0xc218, page::GENERIC_DESKTOP, desktop::GAMEPAD)
            .with_force_feedback(ffb.clone());
        (Rc::new(raw), ffb)
    }

    #[test]
    fn queue_drops_oldest_when_full() {
        let queue = EventQueue::with_capacity(2);
        let id = DeviceId {
            vendor_id: 1,
            product_id: 2,
            location: "q".into(),
        };
        for index in 0..3 {
            queue.receive(&HidEvent {
                device: id.clone(),
                at: std::time::Instant::now(),
                index,
                usage: 0,
                kind: InputKind::ButtonPressed,
            });
        }
        let events = queue.drain();
        assert_eq!(events.iter().map(|e| e.index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(queue.dropped(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn attach_poll_detach() {
        let mut mgr = Manager::new(ManagerConfig::default()).expect("manager");
        let (raw, ffb) = rumble_pad();
        let id = mgr.attach(raw.clone()).expect("attach").expect("recognized");
        assert_eq!(mgr.devices().len(), 1);
        assert!(mgr.attach(raw.clone()).expect("attach").is_none());

        raw.press(3);
        let events = mgr.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].index, 2);
        assert_eq!(events[0].device, id);

        let actuator = mgr
            .device_mut(&id)
            .and_then(Device::actuator_mut)
            .expect("actuator");
        actuator.set_duration(0.0);
        actuator.start();

        assert!(mgr.detach(&id));
        assert!(mgr.devices().is_empty());
        assert!(!mgr.detach(&id));
        assert_eq!(ffb.commands().last(), Some(&FfbCommand::Halt));
        // Release of the held button was pushed during retirement.
        assert_eq!(mgr.take_events().len(), 1);
    }

    #[test]
    fn unknown_device_follows_fallback_policy() {
        let stranger = || {
            Rc::new(VirtualDevice::new(
                0xbeef,
                0x0001,
                page::GENERIC_DESKTOP,
                desktop::JOYSTICK,
            ))
        };

        let mut ignoring = Manager::new(ManagerConfig::default()).expect("manager");
        assert!(ignoring.attach(stranger()).expect("attach").is_none());

        let mut generic = Manager::new(ManagerConfig {
            fallback: FallbackPolicy::Generic,
            ..Default::default()
        })
        .expect("manager");
        let id = generic.attach(stranger()).expect("attach").expect("generic");
        let device = generic.device(&id).expect("device");
        assert_eq!(device.device_type(), "Joystick");
        assert_eq!(device.element_count(), 46);

        let mouse = Rc::new(VirtualDevice::new(0xbeef, 2, page::GENERIC_DESKTOP, desktop::MOUSE));
        assert!(generic.attach(mouse).expect("attach").is_none());
    }

    #[test]
    fn handle_input_routes_by_id() {
        let mut mgr = Manager::new(ManagerConfig::default()).expect("manager");
        let (raw, _) = rumble_pad();
        let id = mgr.attach(raw).expect("attach").expect("recognized");
        let value = RawValue::new(
            page::BUTTON,
            1,
            1,
            crate::event::ElementRef::new(crate::usage_map::ElementKind::Button, 0, 1),
        );
        assert!(mgr.handle_input(&id, &value));
        let other = DeviceId {
            location: "elsewhere".into(),
            ..id.clone()
        };
        assert!(!mgr.handle_input(&other, &value));
        assert_eq!(mgr.take_events().len(), 1);
    }

    #[test]
    fn flush_and_stop_all() {
        let mut mgr = Manager::new(ManagerConfig::default()).expect("manager");
        let (raw, ffb) = rumble_pad();
        let id = mgr.attach(raw.clone()).expect("attach").expect("recognized");
        raw.press(1);
        mgr.poll_events();
        mgr.flush_all();
        let events = mgr.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, InputKind::ButtonReleased);

        mgr.device_mut(&id)
            .and_then(Device::actuator_mut)
            .expect("actuator")
            .start();
        mgr.stop_all_actuators();
        assert!(!mgr.device(&id).and_then(Device::actuator).expect("actuator").is_active());
        assert_eq!(ffb.commands().len(), 2);
    }
}

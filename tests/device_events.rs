//! Element classification and delegate delivery.

use feelhid::backends::virtual_input::VirtualDevice;
use feelhid::usage::{desktop, page};
use feelhid::{
    resolve, ButtonMap, DeviceDelegate, DeviceDescriptor, ElementHandler, ElementKind,
    ElementMap, ElementRef, EventQueue, HidEvent, InputKind, RawValue, UsageMapEntry,
    UsageMapTable,
};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

/// One button: usage 9 on logical index 0.
fn single_button_table() -> UsageMapTable {
    UsageMapTable::new(vec![UsageMapEntry {
        usage_page: page::GENERIC_DESKTOP,
        usage: desktop::JOYSTICK,
        devices: vec![DeviceDescriptor {
            vendor_id: 1234,
            product_id: 5678,
            name: None,
            force_feedback: false,
            elements: vec![ElementMap::new(
                ElementKind::Button,
                vec![ButtonMap::new(9, 0, ElementHandler::Button)],
            )],
        }],
    }])
}

/// Records every pushed event.
#[derive(Default)]
struct Recorder(RefCell<Vec<HidEvent>>);

impl DeviceDelegate for Recorder {
    fn receive(&self, event: &HidEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

fn bound_stick() -> (feelhid::Device, Rc<Recorder>) {
    let raw = Rc::new(VirtualDevice::new(
        1234,
        5678,
        page::GENERIC_DESKTOP,
        desktop::JOYSTICK,
    ));
    let mut device = resolve(raw, &single_button_table()).expect("resolve");
    let recorder = Rc::new(Recorder::default());
    let delegate: Rc<dyn DeviceDelegate> = recorder.clone();
    device.set_delegate(Some(&delegate));
    (device, recorder)
}

fn button_value(usage: u16, value: i32) -> RawValue {
    RawValue::new(
        page::BUTTON,
        usage,
        value,
        ElementRef::new(ElementKind::Button, 0, 1),
    )
}

#[test]
fn mapped_button_pushes_exactly_once() {
    let (mut device, recorder) = bound_stick();
    device.handle_input(&button_value(9, 1));
    let events = recorder.0.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].index, 0);
    assert_eq!(events[0].usage, 9);
    assert_eq!(events[0].kind, InputKind::ButtonPressed);
}

#[test]
fn unmapped_button_pushes_nothing() {
    let (mut device, recorder) = bound_stick();
    device.handle_input(&button_value(10, 1));
    assert!(recorder.0.borrow().is_empty());
}

#[test]
fn dropped_delegate_is_a_no_op() {
    let (mut device, recorder) = bound_stick();
    drop(recorder);
    device.handle_input(&button_value(9, 1));
    device.flush();
}

#[test]
fn keyboard_keys_latch_and_flush() {
    let table = UsageMapTable::new(vec![UsageMapEntry {
        usage_page: page::GENERIC_DESKTOP,
        usage: desktop::KEYBOARD,
        devices: vec![DeviceDescriptor {
            vendor_id: 1,
            product_id: 2,
            name: None,
            force_feedback: false,
            elements: vec![ElementMap::new(
                ElementKind::ScanCodes,
                (0x04..=0x1d)
                    .map(|usage| ButtonMap::new(usage, usage - 0x04, ElementHandler::Key))
                    .collect(),
            )],
        }],
    }]);
    let raw = Rc::new(VirtualDevice::new(1, 2, page::GENERIC_DESKTOP, desktop::KEYBOARD));
    let mut device = resolve(raw.clone(), &table).expect("resolve");
    let queue = Rc::new(EventQueue::default());
    let delegate: Rc<dyn DeviceDelegate> = queue.clone();
    device.set_delegate(Some(&delegate));

    raw.key(0x04, true);
    raw.key(0x05, true);
    raw.key(0x04, false);
    device.poll();
    assert_eq!(
        queue.drain().into_iter().map(|e| e.kind).collect::<Vec<_>>(),
        vec![
            InputKind::KeyPressed { key: 0x04 },
            InputKind::KeyPressed { key: 0x05 },
            InputKind::KeyReleased { key: 0x04 },
        ]
    );

    device.flush();
    let released = queue.drain();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].kind, InputKind::KeyReleased { key: 0x05 });
    assert_eq!(released[0].index, 1);
    assert_eq!(device.device_type(), "Keyboard");
}

#[test]
fn relative_axes_forward_counts() {
    let table = UsageMapTable::new(vec![UsageMapEntry {
        usage_page: page::GENERIC_DESKTOP,
        usage: desktop::MOUSE,
        devices: vec![DeviceDescriptor {
            vendor_id: 1,
            product_id: 3,
            name: None,
            force_feedback: false,
            elements: vec![ElementMap::new(
                ElementKind::Axis,
                vec![
                    ButtonMap::new(desktop::X, 0, ElementHandler::Delta),
                    ButtonMap::new(desktop::WHEEL, 2, ElementHandler::Delta),
                ],
            )],
        }],
    }]);
    let raw = Rc::new(VirtualDevice::new(1, 3, page::GENERIC_DESKTOP, desktop::MOUSE));
    let mut device = resolve(raw.clone(), &table).expect("resolve");
    let queue = Rc::new(EventQueue::default());
    let delegate: Rc<dyn DeviceDelegate> = queue.clone();
    device.set_delegate(Some(&delegate));

    raw.set_axis(desktop::X, -3, -127, 127);
    raw.set_axis(desktop::X, 0, -127, 127);
    raw.set_axis(desktop::WHEEL, 1, -127, 127);
    device.poll();
    let events = queue.drain();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, InputKind::AxisDelta { delta: -3 });
    assert_eq!((events[1].index, events[1].kind.clone()), (2, InputKind::AxisDelta { delta: 1 }));
}

proptest! {
    /// Values for elements outside the bound map never reach the delegate.
    #[test]
    fn prop_unmapped_elements_are_silent(
        usage in any::<u16>(),
        value in any::<i32>(),
        tag in 1u32..=4,
    ) {
        let kind = ElementKind::try_from(tag).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assume!(!(kind == ElementKind::Button && usage == 9));
        let (mut device, recorder) = bound_stick();
        device.handle_input(&RawValue::new(page::BUTTON, usage, value, ElementRef::new(kind, 0, 1)));
        prop_assert!(recorder.0.borrow().is_empty());
    }
}

//! feelhid: HID device matching and force-feedback actuators.
//!
//! Raw OS device handles are resolved against a declarative usage map table into
//! [`Device`]s, whose element bindings classify raw values into [`HidEvent`]s pushed
//! to a [`Manager`]. Devices whose model declares a motor carry an [`Actuator`].

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod actuator;
pub mod backends;
mod builtin_table;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod filtered_listener;
pub mod logger;
pub mod manager;
pub mod matcher;
pub mod metadata;
pub mod report;
pub mod usage;
pub mod usage_map;

pub use actuator::{Actuator, ForceFeedback, RumbleEffect};
pub use config::{FallbackPolicy, ManagerConfig};
pub use device::{Device, DeviceId, DeviceState, RawDevice};
pub use error::{Error, Result};
pub use event::{ElementRef, HidEvent, InputKind, RawValue};
pub use eventbus::{EventFilter, InputEventBus, InputListener};
pub use manager::{DeviceDelegate, EventQueue, Manager};
pub use matcher::{
    build_match_criteria, build_match_criteria_from, resolve, resolve_default, MatchCriterion,
};
pub use metadata::DeviceMeta;
pub use usage_map::{
    ButtonMap, DeviceDescriptor, ElementHandler, ElementKind, ElementMap, UsageMapEntry,
    UsageMapTable,
};

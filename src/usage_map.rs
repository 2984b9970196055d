//! Declarative usage map tables.
//!
//! A [`UsageMapTable`] maps a top-level HID collection `(usage_page, usage)` to the
//! known device models that present it. Each [`DeviceDescriptor`] lists the
//! elements the crate understands on that model and how to classify them.
//!
//! Tables are pure data. The built-in one ([`UsageMapTable::builtin`]) is built once
//! per process and never mutated; additional tables can be loaded from TOML and
//! merged on top of it before a [`Manager`](crate::manager::Manager) starts matching.
//!
//! # TOML layout
//! ```toml
//! [[entry]]
//! usage_page = 0x01
//! usage = 0x05
//!
//! [[entry.device]]
//! vendor_id = 0x1234
//! product_id = 0x5678
//! name = "Bench Pad"
//! force_feedback = true
//!
//! [[entry.device.elements]]
//! kind = "button"
//! buttons = [
//!     { usage = 1, index = 0, handler = "button" },
//!     { usage = 2, index = 1, handler = "button" },
//! ]
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

/// Element type tag, numerically identical to the OS element type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Values that are neither buttons nor axes (hats, vendor fields).
    Misc = 1,
    Button = 2,
    Axis = 3,
    /// Keyboard scan codes (usage page 0x07).
    ScanCodes = 4,
}

impl ElementKind {
    #[inline]
    pub fn tag(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ElementKind {
    type Error = Error;

    fn try_from(tag: u32) -> Result<Self> {
        match tag {
            1 => Ok(ElementKind::Misc),
            2 => Ok(ElementKind::Button),
            3 => Ok(ElementKind::Axis),
            4 => Ok(ElementKind::ScanCodes),
            other => Err(Error::InvalidTable(format!("unknown element type tag {other}"))),
        }
    }
}

/// What a matched element means to the game.
///
/// Resolved once per device at construction and invoked directly on each raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementHandler {
    /// Non-zero = pressed. Emits press/release edges.
    Button,
    /// Absolute axis normalized to `[-1.0, 1.0]` over the element's logical range.
    Axis,
    /// Absolute axis normalized to `[0.0, 1.0]` (pedals, triggers).
    Trigger,
    /// Relative motion (mouse deltas, wheel ticks). Raw counts are forwarded.
    Delta,
    /// POV / D-pad, forwarded as slot `-1 | 0..7` (Up = 0, clockwise).
    Hat,
    /// Keyboard usage. Emits key edges carrying the usage as key code.
    Key,
}

/// One element of a device and the handler bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonMap {
    pub usage: u16,
    /// Logical button / axis / hat index reported upward.
    pub index: u16,
    pub handler: ElementHandler,
}

impl ButtonMap {
    pub const fn new(usage: u16, index: u16, handler: ElementHandler) -> Self {
        Self {
            usage,
            index,
            handler,
        }
    }
}

/// All mapped elements of one type on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementMap {
    pub kind: ElementKind,
    #[serde(default)]
    pub buttons: Vec<ButtonMap>,
}

impl ElementMap {
    pub fn new(kind: ElementKind, buttons: Vec<ButtonMap>) -> Self {
        Self { kind, buttons }
    }
}

/// A known physical device model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Display name used when the OS does not report one.
    #[serde(default)]
    pub name: Option<String>,
    /// The model carries a force-feedback motor.
    #[serde(default)]
    pub force_feedback: bool,
    #[serde(default)]
    pub elements: Vec<ElementMap>,
}

impl DeviceDescriptor {
    #[inline]
    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }

    /// Total number of mapped elements across all element maps.
    pub fn element_count(&self) -> usize {
        self.elements.iter().map(|m| m.buttons.len()).sum()
    }
}

/// A top-level collection and the device models known to present it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMapEntry {
    pub usage_page: u16,
    pub usage: u16,
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceDescriptor>,
}

/// An ordered list of [`UsageMapEntry`]s. Lookups take the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMapTable {
    #[serde(rename = "entry", default)]
    pub entries: Vec<UsageMapEntry>,
}

impl UsageMapTable {
    pub fn new(entries: Vec<UsageMapEntry>) -> Self {
        Self { entries }
    }

    /// The process-wide built-in table.
    pub fn builtin() -> &'static UsageMapTable {
        static BUILTIN: OnceLock<UsageMapTable> = OnceLock::new();
        BUILTIN.get_or_init(crate::builtin_table::build)
    }

    /// Parse and validate a table from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: UsageMapTable = toml::from_str(text)?;
        table.validate()?;
        Ok(table)
    }

    /// Load and validate a table from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, usage_page: u16, usage: u16) -> Option<&UsageMapEntry> {
        self.entries
            .iter()
            .find(|e| e.usage_page == usage_page && e.usage == usage)
    }

    /// Two-level lookup: collection first, then vendor/product within it.
    pub fn find_descriptor(
        &self,
        usage_page: u16,
        usage: u16,
        vendor_id: u16,
        product_id: u16,
    ) -> Option<&DeviceDescriptor> {
        self.entry(usage_page, usage)?
            .devices
            .iter()
            .find(|d| d.matches(vendor_id, product_id))
    }

    /// Layer `other` on top of `self`.
    ///
    /// Descriptors from `other` are placed ahead of existing ones for the same
    /// collection, so a loaded table can override a built-in model.
    pub fn merge(&mut self, other: UsageMapTable) {
        for incoming in other.entries {
            match self
                .entries
                .iter_mut()
                .find(|e| e.usage_page == incoming.usage_page && e.usage == incoming.usage)
            {
                Some(existing) => {
                    let mut devices = incoming.devices;
                    devices.append(&mut existing.devices);
                    existing.devices = devices;
                }
                None => self.entries.push(incoming),
            }
        }
    }

    /// Reject tables whose element bindings would be ambiguous.
    ///
    /// A usage may appear once per element type on a descriptor.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            for desc in &entry.devices {
                let mut seen: HashSet<(ElementKind, u16)> = HashSet::new();
                for map in &desc.elements {
                    for b in &map.buttons {
                        if !seen.insert((map.kind, b.usage)) {
                            return Err(Error::InvalidTable(format!(
                                "{:04x}:{:04x} maps {:?} usage 0x{:02x} twice",
                                desc.vendor_id, desc.product_id, map.kind, b.usage
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

//! HID report descriptor parsing and input report decoding.
//!
//! Transports that hand us whole input reports (hidapi) need a layout to turn the
//! bytes into per-element [`RawValue`]s. [`ReportLayout::parse`] walks the report
//! descriptor once; [`ReportDecoder`] then splits each incoming report into values.
//!
//! Only Input main items are kept. Output/Feature items still advance nothing here
//! because they live in separate report spaces.
//!
//! ## Element classification
//! - Button page (0x09) → [`ElementKind::Button`]
//! - Keyboard page (0x07) → [`ElementKind::ScanCodes`]
//! - Generic Desktop `X..=Wheel` and the Simulation page → [`ElementKind::Axis`]
//! - everything else (hat switch, vendor fields) → [`ElementKind::Misc`]
//!
//! ## Hat policy
//! Hats are normalized to **slots**: `-1` neutral, `0..7` directions (Up = 0,
//! clockwise). 8-position and 4-position hats map directly; anything else is treated
//! as an angular range and cut into 45° sectors.

use crate::error::{Error, Result};
use crate::event::{ElementRef, RawValue};
use crate::usage::{desktop, page};
use crate::usage_map::ElementKind;
use std::collections::{BTreeSet, HashMap};

const MAIN_INPUT: u8 = 0x8;
const MAIN_OUTPUT: u8 = 0x9;
const MAIN_FEATURE: u8 = 0xB;
const MAIN_COLLECTION: u8 = 0xA;
const MAIN_END_COLLECTION: u8 = 0xC;

const GLOBAL_USAGE_PAGE: u8 = 0x0;
const GLOBAL_LOGICAL_MIN: u8 = 0x1;
const GLOBAL_LOGICAL_MAX: u8 = 0x2;
const GLOBAL_REPORT_SIZE: u8 = 0x7;
const GLOBAL_REPORT_ID: u8 = 0x8;
const GLOBAL_REPORT_COUNT: u8 = 0x9;
const GLOBAL_PUSH: u8 = 0xA;
const GLOBAL_POP: u8 = 0xB;

const LOCAL_USAGE: u8 = 0x0;
const LOCAL_USAGE_MIN: u8 = 0x1;
const LOCAL_USAGE_MAX: u8 = 0x2;

const FLAG_CONSTANT: u32 = 0x01;
const FLAG_VARIABLE: u32 = 0x02;
const FLAG_RELATIVE: u32 = 0x04;

/// Widest single value we decode.
pub const MAX_FIELD_BITS: u32 = 32;

/// Upper bound on the input bits of one report id (4 KiB reports).
pub const MAX_REPORT_BITS: u32 = 8 * 4096;

/// One Input main item, expanded enough to decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub report_id: u8,
    /// Bit offset within the report body (after the report id byte).
    pub bit_offset: u32,
    pub bit_size: u32,
    pub count: u32,
    pub usage_page: u16,
    /// Usages for variable fields (one per slot, last one repeats), or the usage
    /// list indexed by array values.
    pub usages: Vec<u16>,
    pub logical_min: i32,
    pub logical_max: i32,
    pub is_array: bool,
    pub is_relative: bool,
    pub kind: ElementKind,
}

impl Field {
    /// Usage for variable slot `i`. HID repeats the last usage for extra slots.
    fn slot_usage(&self, i: usize) -> Option<u16> {
        self.usages.get(i).or_else(|| self.usages.last()).copied()
    }

    /// Bit offset of slot `i`.
    fn slot_offset(&self, i: u32) -> Option<u32> {
        i.checked_mul(self.bit_size)?.checked_add(self.bit_offset)
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Globals {
    usage_page: u16,
    logical_min: i32,
    logical_max: i32,
    logical_max_unsigned: u32,
    report_size: u32,
    report_id: u8,
    report_count: u32,
}

impl Globals {
    /// Devices often declare e.g. min=0 max=255 in one byte, which reads as -1.
    fn effective_max(&self) -> i32 {
        if self.logical_min >= 0 && self.logical_max < 0 {
            self.logical_max_unsigned as i32
        } else {
            self.logical_max
        }
    }
}

#[derive(Debug, Default)]
struct Locals {
    usages: Vec<(Option<u16>, u16)>,
    usage_min: Option<(Option<u16>, u16)>,
    usage_max: Option<(Option<u16>, u16)>,
}

/// Parsed input layout of one device.
#[derive(Clone, Debug, Default)]
pub struct ReportLayout {
    pub fields: Vec<Field>,
    /// Top-level collection usage page/usage (first Application collection).
    pub collection: Option<(u16, u16)>,
    pub uses_report_ids: bool,
    /// The descriptor declares Physical Interface (PID) items.
    pub force_feedback: bool,
}

fn element_kind(usage_page: u16, usage: u16) -> ElementKind {
    match usage_page {
        page::BUTTON => ElementKind::Button,
        page::KEYBOARD => ElementKind::ScanCodes,
        page::SIMULATION => ElementKind::Axis,
        page::GENERIC_DESKTOP if (desktop::X..=desktop::WHEEL).contains(&usage) => {
            ElementKind::Axis
        }
        _ => ElementKind::Misc,
    }
}

fn unsigned(data: &[u8]) -> u32 {
    data.iter()
        .rev()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn signed(data: &[u8]) -> i32 {
    match data.len() {
        0 => 0,
        1 => i32::from(data[0] as i8),
        2 => i32::from(i16::from_le_bytes([data[0], data[1]])),
        _ => unsigned(data) as i32,
    }
}

/// Split a local usage item into `(explicit page, usage)`.
fn local_usage(data: &[u8]) -> (Option<u16>, u16) {
    let v = unsigned(data);
    if data.len() == 4 {
        (Some((v >> 16) as u16), v as u16)
    } else {
        (None, v as u16)
    }
}

impl ReportLayout {
    /// Walk a report descriptor and collect its Input fields.
    pub fn parse(descriptor: &[u8]) -> Result<Self> {
        let mut layout = ReportLayout::default();
        let mut globals = Globals::default();
        let mut stack: Vec<Globals> = Vec::new();
        let mut locals = Locals::default();
        let mut offsets: HashMap<u8, u32> = HashMap::new();
        let mut depth: u32 = 0;

        let mut pos = 0usize;
        while pos < descriptor.len() {
            let prefix = descriptor[pos];
            pos += 1;

            // Long item: skip its payload entirely.
            if prefix == 0xFE {
                let size = *descriptor
                    .get(pos)
                    .ok_or_else(|| Error::InvalidDescriptor("truncated long item".into()))?;
                pos += 2 + usize::from(size);
                continue;
            }

            let size = match prefix & 0x03 {
                3 => 4,
                n => usize::from(n),
            };
            let data = descriptor.get(pos..pos + size).ok_or_else(|| {
                Error::InvalidDescriptor(format!("item at byte {} runs past the end", pos - 1))
            })?;
            pos += size;

            let item_type = (prefix >> 2) & 0x03;
            let tag = prefix >> 4;

            match item_type {
                // Main
                0 => {
                    match tag {
                        MAIN_INPUT => {
                            let flags = unsigned(data);
                            if globals.report_size > MAX_FIELD_BITS {
                                return Err(Error::InvalidDescriptor(format!(
                                    "report size {} exceeds {MAX_FIELD_BITS} bits",
                                    globals.report_size
                                )));
                            }
                            let offset = offsets.entry(globals.report_id).or_insert(0);
                            let end = globals
                                .report_size
                                .checked_mul(globals.report_count)
                                .and_then(|bits| offset.checked_add(bits))
                                .filter(|&end| end <= MAX_REPORT_BITS)
                                .ok_or_else(|| {
                                    Error::InvalidDescriptor(format!(
                                        "report {} exceeds {MAX_REPORT_BITS} input bits",
                                        globals.report_id
                                    ))
                                })?;
                            if flags & FLAG_CONSTANT == 0 && globals.report_size > 0 {
                                let (usage_page, usages) =
                                    expand_usages(&locals, globals.usage_page);
                                let first = usages.first().copied().unwrap_or(0);
                                layout.fields.push(Field {
                                    report_id: globals.report_id,
                                    bit_offset: *offset,
                                    bit_size: globals.report_size,
                                    count: globals.report_count,
                                    usage_page,
                                    usages,
                                    logical_min: globals.logical_min,
                                    logical_max: globals.effective_max(),
                                    is_array: flags & FLAG_VARIABLE == 0,
                                    is_relative: flags & FLAG_RELATIVE != 0,
                                    kind: element_kind(usage_page, first),
                                });
                            }
                            *offset = end;
                        }
                        MAIN_OUTPUT | MAIN_FEATURE => {}
                        MAIN_COLLECTION => {
                            if depth == 0 && layout.collection.is_none() {
                                if let Some(&(p, u)) = locals.usages.first() {
                                    layout.collection = Some((p.unwrap_or(globals.usage_page), u));
                                }
                            }
                            depth += 1;
                        }
                        MAIN_END_COLLECTION => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    locals = Locals::default();
                }
                // Global
                1 => match tag {
                    GLOBAL_USAGE_PAGE => {
                        globals.usage_page = unsigned(data) as u16;
                        layout.force_feedback |= globals.usage_page == page::PHYSICAL_INTERFACE;
                    }
                    GLOBAL_LOGICAL_MIN => globals.logical_min = signed(data),
                    GLOBAL_LOGICAL_MAX => {
                        globals.logical_max = signed(data);
                        globals.logical_max_unsigned = unsigned(data);
                    }
                    GLOBAL_REPORT_SIZE => globals.report_size = unsigned(data),
                    GLOBAL_REPORT_ID => {
                        globals.report_id = unsigned(data) as u8;
                        layout.uses_report_ids = true;
                    }
                    GLOBAL_REPORT_COUNT => globals.report_count = unsigned(data),
                    GLOBAL_PUSH => stack.push(globals),
                    GLOBAL_POP => {
                        globals = stack.pop().ok_or_else(|| {
                            Error::InvalidDescriptor("pop without matching push".into())
                        })?;
                    }
                    _ => {}
                },
                // Local
                2 => match tag {
                    LOCAL_USAGE => locals.usages.push(local_usage(data)),
                    LOCAL_USAGE_MIN => locals.usage_min = Some(local_usage(data)),
                    LOCAL_USAGE_MAX => locals.usage_max = Some(local_usage(data)),
                    _ => {}
                },
                _ => {}
            }
        }

        if layout.fields.is_empty() {
            return Err(Error::InvalidDescriptor("no input fields".into()));
        }
        Ok(layout)
    }

    /// Report ids carrying input fields.
    pub fn report_ids(&self) -> BTreeSet<u8> {
        self.fields.iter().map(|f| f.report_id).collect()
    }

    /// Largest input report in bytes, including the id prefix when ids are used.
    pub fn max_report_len(&self) -> usize {
        let mut ends: HashMap<u8, u64> = HashMap::new();
        for f in &self.fields {
            let end = u64::from(f.bit_offset) + u64::from(f.bit_size) * u64::from(f.count);
            let e = ends.entry(f.report_id).or_insert(0);
            *e = (*e).max(end);
        }
        let body = ends.values().copied().max().unwrap_or(0).div_ceil(8) as usize;
        body + usize::from(self.uses_report_ids)
    }
}

fn expand_usages(locals: &Locals, default_page: u16) -> (u16, Vec<u16>) {
    if let (Some((pmin, min)), Some((_, max))) = (locals.usage_min, locals.usage_max) {
        let page = pmin.unwrap_or(default_page);
        if min <= max {
            return (page, (min..=max).collect());
        }
    }
    let page = locals
        .usages
        .first()
        .and_then(|(p, _)| *p)
        .unwrap_or(default_page);
    (page, locals.usages.iter().map(|&(_, u)| u).collect())
}

/// Little-endian bit extraction; `None` when the report is too short.
fn extract_bits(data: &[u8], bit_offset: u32, bit_size: u32) -> Option<u32> {
    if bit_size == 0 || bit_size > MAX_FIELD_BITS {
        return None;
    }
    let last_bit = bit_offset.checked_add(bit_size - 1)?;
    if (last_bit / 8) as usize >= data.len() {
        return None;
    }
    let mut value = 0u32;
    for j in 0..bit_size {
        let bit = bit_offset + j;
        let byte = data[(bit / 8) as usize];
        value |= u32::from((byte >> (bit % 8)) & 1) << j;
    }
    Some(value)
}

fn sign_extend(raw: u32, bit_size: u32) -> i32 {
    if bit_size >= 32 {
        return raw as i32;
    }
    let shift = 32 - bit_size;
    ((raw << shift) as i32) >> shift
}

/// Stateful decoder: array fields (keyboards) only report what is held, so the
/// decoder remembers them to synthesize releases.
#[derive(Clone, Debug)]
pub struct ReportDecoder {
    layout: ReportLayout,
    held: HashMap<usize, BTreeSet<u16>>,
}

impl ReportDecoder {
    pub fn new(layout: ReportLayout) -> Self {
        Self {
            layout,
            held: HashMap::new(),
        }
    }

    pub fn layout(&self) -> &ReportLayout {
        &self.layout
    }

    /// Decode one input report (as read from the OS, id prefix included when the
    /// layout uses report ids) and append its values to `out`.
    pub fn decode(&mut self, report: &[u8], out: &mut Vec<RawValue>) {
        let (report_id, body) = if self.layout.uses_report_ids {
            match report.split_first() {
                Some((&id, rest)) => (id, rest),
                None => return,
            }
        } else {
            (0, report)
        };

        for (fi, field) in self.layout.fields.iter().enumerate() {
            if field.report_id != report_id {
                continue;
            }
            if field.is_array {
                let mut now = BTreeSet::new();
                for i in 0..field.count {
                    let Some(raw) = field
                        .slot_offset(i)
                        .and_then(|at| extract_bits(body, at, field.bit_size))
                    else {
                        break;
                    };
                    let idx = raw as i64 - i64::from(field.logical_min);
                    if raw == 0 || idx < 0 {
                        continue;
                    }
                    if let Some(&usage) = field.usages.get(idx as usize) {
                        now.insert(usage);
                    }
                }
                let before = self.held.entry(fi).or_default();
                for &usage in before.difference(&now) {
                    out.push(array_value(field, fi, usage, 0));
                }
                for &usage in now.difference(before) {
                    out.push(array_value(field, fi, usage, 1));
                }
                *before = now;
                continue;
            }

            for i in 0..field.count {
                let Some(raw) = field
                    .slot_offset(i)
                    .and_then(|at| extract_bits(body, at, field.bit_size))
                else {
                    break;
                };
                let Some(usage) = field.slot_usage(i as usize) else {
                    break;
                };
                let value = if field.logical_min < 0 {
                    sign_extend(raw, field.bit_size)
                } else {
                    raw as i32
                };
                out.push(RawValue {
                    usage_page: field.usage_page,
                    usage,
                    value,
                    element: ElementRef {
                        kind: element_kind(field.usage_page, usage),
                        logical_min: field.logical_min,
                        logical_max: field.logical_max,
                        cookie: ((fi as u32) << 8) | (i & 0xFF),
                    },
                });
            }
        }
    }
}

fn array_value(field: &Field, fi: usize, usage: u16, value: i32) -> RawValue {
    RawValue {
        usage_page: field.usage_page,
        usage,
        value,
        element: ElementRef {
            kind: element_kind(field.usage_page, usage),
            logical_min: 0,
            logical_max: 1,
            cookie: (fi as u32) << 8,
        },
    }
}

// --------------------- normalization helpers ---------------------

/// Normalize an integer axis value from `[lo..hi]` into `[-1.0, 1.0]` with clamping.
pub fn normalize_axis(v: i32, lo: i32, hi: i32) -> f32 {
    let lo = f64::from(lo);
    let hi = f64::from(hi);
    if (hi - lo).abs() < 1e-9 {
        return 0.0;
    }
    let t = (f64::from(v) - lo) / (hi - lo);
    (t * 2.0 - 1.0).clamp(-1.0, 1.0) as f32
}

/// Normalize an integer value from `[lo..hi]` into `[0.0, 1.0]` with clamping.
pub fn normalize_trigger(v: i32, lo: i32, hi: i32) -> f32 {
    let lo = f64::from(lo);
    let hi = f64::from(hi);
    if (hi - lo).abs() < 1e-9 {
        return 0.0;
    }
    ((f64::from(v) - lo) / (hi - lo)).clamp(0.0, 1.0) as f32
}

/// Convert a raw hat value into a slot: `-1` neutral, `0..7` directions.
///
/// Out-of-range values are the usual null state and map to neutral.
pub fn hat_value_to_slot(raw: i32, lo: i32, hi: i32) -> i16 {
    if raw < lo || raw > hi {
        return -1;
    }
    let span = i64::from(hi) - i64::from(lo) + 1;
    let pos = i64::from(raw) - i64::from(lo);
    match span {
        8 => pos as i16,
        4 => (pos * 2) as i16,
        _ if hi >= 315 => {
            // degrees
            (((raw as f32 + 22.5) / 45.0).floor() as i32).rem_euclid(8) as i16
        }
        _ => ((pos * 8) / span).clamp(0, 7) as i16,
    }
}

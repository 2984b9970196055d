//! hidapi-backed raw devices.
//!
//! [`HidapiDevice`] wraps an open `hidapi::HidDevice`. It is responsible for:
//! - opening the handle in non-blocking mode
//! - fetching and parsing the report descriptor once
//! - draining a bounded number of input reports per poll into [`RawValue`]s
//! - exposing a PID force-feedback transport when the descriptor declares one
//!
//! It does **not** classify anything; that is the bound [`Device`](crate::device::Device)'s job.

use crate::actuator::ForceFeedback;
use crate::backends::pid::{OutputSink, PidForceFeedback};
use crate::device::RawDevice;
use crate::error::{Error, Result};
use crate::event::RawValue;
use crate::report::{ReportDecoder, ReportLayout};
use hidapi::{DeviceInfo, HidApi, HidDevice};
use std::cell::RefCell;
use std::rc::Rc;

/// Safety valve: default maximum number of reports drained per poll.
///
/// Prevents a single device from starving the rest of the loop if it produces data
/// faster than the host polls.
pub const MAX_REPORTS_PER_TICK: usize = 32;

const REPORT_DESCRIPTOR_BUF: usize = 4096;
const MIN_READ_BUF: usize = 64;

/// Output reports go straight to the shared handle.
struct HidSink(Rc<HidDevice>);

impl OutputSink for HidSink {
    fn write_report(&self, report: &[u8]) -> Result<()> {
        self.0
            .write(report)
            .map(|_| ())
            .map_err(|e| Error::TransportRejected(e.to_string()))
    }
}

pub struct HidapiDevice {
    handle: Rc<HidDevice>,
    vendor_id: u16,
    product_id: u16,
    usage_page: u16,
    usage: u16,
    location: String,
    manufacturer: Option<String>,
    product: Option<String>,
    decoder: RefCell<ReportDecoder>,
    buf: RefCell<Vec<u8>>,
    max_reports: usize,
    force_feedback: Option<Rc<PidForceFeedback<HidSink>>>,
}

impl HidapiDevice {
    /// Open and wrap a hidapi device entry.
    pub fn open(info: &DeviceInfo, api: &HidApi, max_reports: usize) -> Result<Self> {
        let handle = info.open_device(api)?;
        // The host drives polling; a failure here only means reads may block briefly.
        if let Err(e) = handle.set_blocking_mode(false) {
            tracing::debug!(error = %e, "non-blocking mode unavailable");
        }

        let mut raw_descriptor = vec![0u8; REPORT_DESCRIPTOR_BUF];
        let len = handle.get_report_descriptor(&mut raw_descriptor)?;
        let layout = ReportLayout::parse(&raw_descriptor[..len])?;

        // Some platforms report 0/0 for the enumeration entry; fall back to the descriptor.
        let (usage_page, usage) = match (info.usage_page(), layout.collection) {
            (0, Some(collection)) => collection,
            _ => (info.usage_page(), info.usage()),
        };

        let handle = Rc::new(handle);
        let force_feedback = layout
            .force_feedback
            .then(|| Rc::new(PidForceFeedback::new(HidSink(handle.clone()))));
        let buf = vec![0u8; layout.max_report_len().max(MIN_READ_BUF)];

        tracing::debug!(
            path = %info.path().to_string_lossy(),
            usage_page,
            usage,
            fields = layout.fields.len(),
            pid = layout.force_feedback,
            "hid device opened"
        );

        Ok(Self {
            handle,
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            usage_page,
            usage,
            location: info.path().to_string_lossy().into_owned(),
            manufacturer: info.manufacturer_string().map(str::to_string),
            product: info.product_string().map(str::to_string),
            decoder: RefCell::new(ReportDecoder::new(layout)),
            buf: RefCell::new(buf),
            max_reports: max_reports.max(1),
            force_feedback,
        })
    }

    pub fn layout(&self) -> ReportLayout {
        self.decoder.borrow().layout().clone()
    }
}

impl RawDevice for HidapiDevice {
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

    /// Drain up to `max_reports` pending input reports.
    fn poll_values(&self, out: &mut Vec<RawValue>) -> Result<()> {
        let mut buf = self.buf.borrow_mut();
        let mut decoder = self.decoder.borrow_mut();
        for _ in 0..self.max_reports {
            match self.handle.read(&mut buf)? {
                0 => break,
                n => decoder.decode(&buf[..n], out),
            }
        }
        Ok(())
    }

    fn force_feedback(&self) -> Option<Rc<dyn ForceFeedback>> {
        self.force_feedback
            .clone()
            .map(|ffb| ffb as Rc<dyn ForceFeedback>)
    }
}

/// Open every enumerated device `accept` lets through.
///
/// Devices that fail to open or whose descriptor cannot be parsed are logged and
/// skipped.
pub fn probe_devices(
    api: &HidApi,
    accept: impl Fn(&DeviceInfo) -> bool,
    max_reports: usize,
) -> Vec<Rc<dyn RawDevice>> {
    let mut found: Vec<Rc<dyn RawDevice>> = Vec::new();
    for info in api.device_list().filter(|info| accept(info)) {
        match HidapiDevice::open(info, api, max_reports) {
            Ok(device) => found.push(Rc::new(device)),
            Err(e) => tracing::debug!(
                path = %info.path().to_string_lossy(),
                error = %e,
                "skipping hid device"
            ),
        }
    }
    found
}

//! Error taxonomy.
//!
//! None of these are fatal to the host: a controller that is unknown, lacks a
//! motor, or vanishes mid-command is reported and the caller carries on.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No usage map entry / descriptor matched the raw device.
    #[error(
        "unrecognized device {vendor_id:04x}:{product_id:04x} (usage page 0x{usage_page:02x}, usage 0x{usage:02x})"
    )]
    UnrecognizedDevice {
        vendor_id: u16,
        product_id: u16,
        usage_page: u16,
        usage: u16,
    },

    /// Actuator construction on a device without a force-feedback transport.
    #[error("device {vendor_id:04x}:{product_id:04x} has no force-feedback capability")]
    NoForceFeedbackCapability { vendor_id: u16, product_id: u16 },

    /// The OS layer refused a force-feedback command (device removed, pipe stalled, ...).
    #[error("force-feedback transport rejected command: {0}")]
    TransportRejected(String),

    /// A usage map table failed validation.
    #[error("invalid usage map table: {0}")]
    InvalidTable(String),

    /// A HID report descriptor could not be parsed.
    #[error("invalid report descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "hid")]
    #[error("hid communication error: {0}")]
    Hid(#[from] hidapi::HidError),
}

pub type Result<T> = std::result::Result<T, Error>;

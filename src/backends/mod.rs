//! Raw-device backends for `feelhid`.
//!
//! Implementations of [`RawDevice`](crate::device::RawDevice) and
//! [`ForceFeedback`](crate::actuator::ForceFeedback) for concrete input sources.
//!
//! # Feature flags
//! - **`hid`** enables the cross-platform `hidapi` backend (default).
//!
//! The virtual backend and the PID encoders are always available.

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;
pub mod pid;
pub mod virtual_input;

//! USB HID Physical Interface Device (PID) output report encoding.
//!
//! Drives the single constant-force effect an [`Actuator`](crate::actuator::Actuator)
//! needs. Encoders are pure and allocation-free; [`PidForceFeedback`] writes their
//! output through an [`OutputSink`].
//!
//! Default report ids follow the PID class sample descriptor:
//!
//! | Report             | Id     | Layout                                                    |
//! |--------------------|--------|-----------------------------------------------------------|
//! | Set Effect         | `0x01` | id, block, type, duration, trigger repeat, sample period, gain, trigger button, axes, direction |
//! | Set Constant Force | `0x05` | id, block, magnitude (i16 LE, 0..=10000)                  |
//! | Effect Operation   | `0x0A` | id, block, operation, loop count                          |
//!
//! Multi-byte fields are little-endian; durations are milliseconds with `0xFFFF`
//! meaning infinite.

use crate::actuator::{ForceFeedback, RumbleEffect};
use crate::error::Result;
use std::time::Duration;

pub const SET_EFFECT_REPORT_LEN: usize = 13;
pub const SET_CONSTANT_FORCE_REPORT_LEN: usize = 4;
pub const EFFECT_OPERATION_REPORT_LEN: usize = 4;

pub mod report_ids {
    pub const SET_EFFECT: u8 = 0x01;
    pub const SET_CONSTANT_FORCE: u8 = 0x05;
    pub const EFFECT_OPERATION: u8 = 0x0A;
}

/// PID effect type `ET Constant Force`, as enumerated by the sample descriptor.
pub const EFFECT_TYPE_CONSTANT: u8 = 0x01;

/// Duration value meaning "until stopped".
pub const INFINITE_DURATION: u16 = 0xFFFF;

/// Full-scale magnitude.
pub const MAX_MAGNITUDE: i16 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOperation {
    Start = 1,
    StartSolo = 2,
    Stop = 3,
}

/// `None` or anything past the 16-bit range encodes as infinite.
pub fn duration_ms(duration: Option<Duration>) -> u16 {
    duration
        .map(|d| d.as_millis())
        .and_then(|ms| u16::try_from(ms).ok())
        .filter(|&ms| ms != INFINITE_DURATION)
        .unwrap_or(INFINITE_DURATION)
}

/// `0.0..=1.0` to PID magnitude units. NaN encodes as zero.
pub fn magnitude(value: f32) -> i16 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * f32::from(MAX_MAGNITUDE)).round() as i16
}

/// Encode a Set Effect report for a constant-force effect in `block`.
pub fn encode_set_effect(
    block: u8,
    duration: Option<Duration>,
    out: &mut [u8; SET_EFFECT_REPORT_LEN],
) -> usize {
    out.fill(0);
    out[0] = report_ids::SET_EFFECT;
    out[1] = block;
    out[2] = EFFECT_TYPE_CONSTANT;
    out[3..5].copy_from_slice(&duration_ms(duration).to_le_bytes());
    // trigger repeat interval and sample period stay 0
    out[9] = 0xFF; // gain
    out[10] = 0xFF; // no trigger button
    out[11] = 0x03; // X and Y axes enabled
    out[12] = 0x00; // direction: north
    SET_EFFECT_REPORT_LEN
}

/// Encode a Set Constant Force report.
pub fn encode_constant_force(
    block: u8,
    value: f32,
    out: &mut [u8; SET_CONSTANT_FORCE_REPORT_LEN],
) -> usize {
    out.fill(0);
    out[0] = report_ids::SET_CONSTANT_FORCE;
    out[1] = block;
    out[2..4].copy_from_slice(&magnitude(value).to_le_bytes());
    SET_CONSTANT_FORCE_REPORT_LEN
}

/// Encode an Effect Operation report.
pub fn encode_operation(
    block: u8,
    operation: EffectOperation,
    loop_count: u8,
    out: &mut [u8; EFFECT_OPERATION_REPORT_LEN],
) -> usize {
    out[0] = report_ids::EFFECT_OPERATION;
    out[1] = block;
    out[2] = operation as u8;
    out[3] = loop_count;
    EFFECT_OPERATION_REPORT_LEN
}

/// Where encoded output reports go (an open HID handle, a capture buffer).
pub trait OutputSink {
    fn write_report(&self, report: &[u8]) -> Result<()>;
}

/// Constant-force rumble over PID output reports.
pub struct PidForceFeedback<S: OutputSink> {
    sink: S,
    block: u8,
}

impl<S: OutputSink> PidForceFeedback<S> {
    /// Uses effect block 1.
    pub fn new(sink: S) -> Self {
        Self { sink, block: 1 }
    }

    pub fn with_block(mut self, block: u8) -> Self {
        self.block = block;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: OutputSink> PidForceFeedback<S> {
    fn configure_and_start(&self, effect: &RumbleEffect) -> Result<()> {
        let mut set_effect = [0u8; SET_EFFECT_REPORT_LEN];
        let n = encode_set_effect(self.block, effect.duration, &mut set_effect);
        self.sink.write_report(&set_effect[..n])?;

        let mut force = [0u8; SET_CONSTANT_FORCE_REPORT_LEN];
        let n = encode_constant_force(self.block, effect.magnitude, &mut force);
        self.sink.write_report(&force[..n])?;

        let mut op = [0u8; EFFECT_OPERATION_REPORT_LEN];
        let n = encode_operation(self.block, EffectOperation::Start, 1, &mut op);
        self.sink.write_report(&op[..n])
    }
}

impl<S: OutputSink> ForceFeedback for PidForceFeedback<S> {
    /// One effect command on the wire is three reports. If any of them is
    /// rejected the block may be half configured (or, with the old parameters,
    /// still running), so a stop is sent before the error is returned.
    fn play(&self, effect: &RumbleEffect) -> Result<()> {
        let result = self.configure_and_start(effect);
        if result.is_err() {
            if let Err(e) = self.halt() {
                tracing::debug!(block = self.block, error = %e, "halt after failed play rejected");
            }
        }
        result
    }

    fn halt(&self) -> Result<()> {
        let mut op = [0u8; EFFECT_OPERATION_REPORT_LEN];
        let n = encode_operation(self.block, EffectOperation::Stop, 0, &mut op);
        self.sink.write_report(&op[..n])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct Capture {
        reports: RefCell<Vec<Vec<u8>>>,
        stalled: Cell<bool>,
        refuse: Cell<Option<u8>>,
    }

    impl OutputSink for Capture {
        fn write_report(&self, report: &[u8]) -> Result<()> {
            if self.stalled.get() || self.refuse.get() == report.first().copied() {
                return Err(Error::TransportRejected("pipe stalled".into()));
            }
            self.reports.borrow_mut().push(report.to_vec());
            Ok(())
        }
    }

    #[test]
    fn constant_force_layout() {
        let mut out = [0u8; SET_CONSTANT_FORCE_REPORT_LEN];
        assert_eq!(encode_constant_force(1, 0.5, &mut out), 4);
        assert_eq!(out, [0x05, 0x01, 0x88, 0x13]); // 5000

        encode_constant_force(2, 7.0, &mut out);
        assert_eq!(i16::from_le_bytes([out[2], out[3]]), MAX_MAGNITUDE);
        encode_constant_force(2, f32::NAN, &mut out);
        assert_eq!(&out[2..], &[0, 0]);
    }

    #[test]
    fn durations() {
        assert_eq!(duration_ms(None), INFINITE_DURATION);
        assert_eq!(duration_ms(Some(Duration::from_millis(250))), 250);
        assert_eq!(duration_ms(Some(Duration::from_secs(3600))), INFINITE_DURATION);

        let mut out = [0u8; SET_EFFECT_REPORT_LEN];
        encode_set_effect(1, Some(Duration::from_millis(0x0102)), &mut out);
        assert_eq!(&out[..5], &[0x01, 0x01, EFFECT_TYPE_CONSTANT, 0x02, 0x01]);
    }

    #[test]
    fn play_then_halt_sequence() {
        let ffb = PidForceFeedback::new(Capture::default());
        ffb.play(&RumbleEffect {
            magnitude: 1.0,
            duration: None,
        })
        .expect("play");
        ffb.halt().expect("halt");

        let reports = ffb.sink().reports.borrow();
        let ids: Vec<u8> = reports.iter().map(|r| r[0]).collect();
        assert_eq!(
            ids,
            vec![
                report_ids::SET_EFFECT,
                report_ids::SET_CONSTANT_FORCE,
                report_ids::EFFECT_OPERATION,
                report_ids::EFFECT_OPERATION
            ]
        );
        assert_eq!(reports[2], vec![0x0A, 0x01, 1, 1]);
        assert_eq!(reports[3], vec![0x0A, 0x01, 3, 0]);
    }

    #[test]
    fn partial_play_is_followed_by_stop() {
        let ffb = PidForceFeedback::new(Capture::default());
        ffb.sink().refuse.set(Some(report_ids::SET_CONSTANT_FORCE));
        let played = ffb.play(&RumbleEffect {
            magnitude: 0.5,
            duration: None,
        });
        assert!(matches!(played, Err(Error::TransportRejected(_))));

        let reports = ffb.sink().reports.borrow();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0][0], report_ids::SET_EFFECT);
        assert_eq!(reports[1], vec![0x0A, 0x01, 3, 0]);
    }

    #[test]
    fn stalled_pipe_surfaces_rejection() {
        let ffb = PidForceFeedback::new(Capture::default()).with_block(2);
        ffb.sink().stalled.set(true);
        assert!(matches!(ffb.halt(), Err(Error::TransportRejected(_))));
    }
}

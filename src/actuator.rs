//! Force-feedback actuators.
//!
//! An [`Actuator`] is the motor of one [`Device`]. Callers set an intensity and a
//! duration, then [`start`](Actuator::start) it; the effect runs until
//! [`stop`](Actuator::stop) or until the duration elapses.
//!
//! ```text
//! Stopped --start()--> Running --stop() / duration elapsed--> Stopped
//! ```
//!
//! ## Parameter policy
//! - Setters store values verbatim.
//! - `start()` clamps intensity into `[0.0, 1.0]` (NaN plays as `0.0`).
//! - A duration that is `<= 0`, non-finite or too large for [`Duration`] plays
//!   with the device default, which for most transports means "until stopped".
//!
//! A rejected command never panics or propagates: it is logged and the actuator
//! stays (or becomes) Stopped, so the caller may simply retry.

use crate::device::{Device, DeviceId};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Default intensity of a freshly bound actuator.
pub const DEFAULT_INTENSITY: f32 = 1.0;

/// Default duration of a freshly bound actuator, in seconds.
pub const DEFAULT_DURATION: f32 = 0.25;

/// One effect command as handed to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RumbleEffect {
    /// `0.0..=1.0`.
    pub magnitude: f32,
    /// `None` = device default / until halted.
    pub duration: Option<Duration>,
}

/// The OS-side effect pipe of a device.
pub trait ForceFeedback {
    /// Create (or replace) and start the effect.
    fn play(&self, effect: &RumbleEffect) -> Result<()>;

    /// Stop whatever is playing.
    fn halt(&self) -> Result<()>;
}

pub struct Actuator {
    device: DeviceId,
    transport: Rc<dyn ForceFeedback>,
    intensity: f32,
    duration: f32,
    /// Start time and effective length of the running effect.
    running: Option<(Instant, Option<Duration>)>,
    /// A play was accepted and no halt has gone out since. A later rejected
    /// restart leaves the earlier effect playing, so this outlives `running`.
    engaged: bool,
}

impl std::fmt::Debug for Actuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuator")
            .field("device", &self.device)
            .field("intensity", &self.intensity)
            .field("duration", &self.duration)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Actuator {
    /// Bind to `device`'s force-feedback transport.
    ///
    /// Fails with [`Error::NoForceFeedbackCapability`] when the matched descriptor
    /// does not declare a motor or the transport cannot drive one. Only
    /// [`Device::bind`] calls this: one actuator per transport, so no second
    /// owner can halt an effect it did not start.
    pub(crate) fn new(device: &Device) -> Result<Self> {
        let transport = device
            .descriptor()
            .force_feedback
            .then(|| device.raw().force_feedback())
            .flatten()
            .ok_or_else(|| Error::NoForceFeedbackCapability {
                vendor_id: device.vendor_id(),
                product_id: device.product_id(),
            })?;

        Ok(Self {
            device: device.id().clone(),
            transport,
            intensity: DEFAULT_INTENSITY,
            duration: DEFAULT_DURATION,
            running: None,
            engaged: false,
        })
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity;
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Seconds.
    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration;
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn is_active(&self) -> bool {
        match self.running {
            Some((at, Some(length))) => at.elapsed() < length,
            Some((_, None)) => true,
            None => false,
        }
    }

    /// Time left on the running effect. `None` when stopped or open-ended.
    pub fn remaining(&self) -> Option<Duration> {
        let (at, length) = self.running?;
        let left = length?.checked_sub(at.elapsed())?;
        (!left.is_zero()).then_some(left)
    }

    /// The effect `start()` would issue with the current parameters.
    pub fn effect(&self) -> RumbleEffect {
        let magnitude = if self.intensity.is_nan() {
            0.0
        } else {
            self.intensity.clamp(0.0, 1.0)
        };
        let duration = if self.duration > 0.0 {
            Duration::try_from_secs_f32(self.duration).ok()
        } else {
            None
        };
        RumbleEffect {
            magnitude,
            duration,
        }
    }

    /// Play the effect. Restarts it when already running.
    pub fn start(&mut self) {
        let effect = self.effect();
        match self.transport.play(&effect) {
            Ok(()) => {
                self.running = Some((Instant::now(), effect.duration));
                self.engaged = true;
                tracing::debug!(
                    device = %self.device,
                    magnitude = effect.magnitude,
                    duration = ?effect.duration,
                    "actuator started"
                );
            }
            Err(e) => {
                self.running = None;
                tracing::warn!(device = %self.device, error = %e, "actuator start rejected");
            }
        }
    }

    /// Stop unconditionally. Never fails.
    ///
    /// Halts the transport whenever an accepted effect may still be playing,
    /// including after a rejected restart.
    pub fn stop(&mut self) {
        self.running = None;
        if !std::mem::take(&mut self.engaged) {
            return;
        }
        if let Err(e) = self.transport.halt() {
            // The motor is gone or already idle; logically we are stopped either way.
            tracing::debug!(device = %self.device, error = %e, "actuator halt rejected");
        }
    }
}

impl Drop for Actuator {
    fn drop(&mut self) {
        self.stop();
    }
}

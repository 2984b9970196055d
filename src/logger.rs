use crate::event::{HidEvent, InputKind};
use crate::eventbus::InputListener;

/// A listener that logs every event through `tracing` at info level.
#[derive(Debug, Default)]
pub struct Logger {
    count: u64,
}

impl Logger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl InputListener for Logger {
    fn on_input(&mut self, event: &HidEvent) {
        self.count += 1;
        match event.kind {
            InputKind::AxisMoved { value } => {
                tracing::info!(device = %event.device, index = event.index, value, "axis")
            }
            _ => tracing::info!(
                device = %event.device,
                index = event.index,
                usage = event.usage,
                kind = ?event.kind,
                "input"
            ),
        }
    }
}

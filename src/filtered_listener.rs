use crate::event::HidEvent;
use crate::eventbus::InputListener;

/// Wraps a listener and filters events based on a user-supplied predicate.
pub struct FilteredListener {
    predicate: Box<dyn Fn(&HidEvent) -> bool>,
    inner: Box<dyn InputListener>,
}

impl FilteredListener {
    pub fn new(
        predicate: impl Fn(&HidEvent) -> bool + 'static,
        inner: impl InputListener + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            inner: Box::new(inner),
        }
    }

    /// Only events whose logical index is in `indices`.
    pub fn indices(indices: Vec<u16>, inner: impl InputListener + 'static) -> Self {
        Self::new(move |e| indices.contains(&e.index), inner)
    }
}

impl InputListener for FilteredListener {
    fn on_input(&mut self, event: &HidEvent) {
        if (self.predicate)(event) {
            self.inner.on_input(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceId;
    use crate::event::InputKind;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn forwards_matching_indices_only() {
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let mut listener =
            FilteredListener::indices(vec![2, 5], move |_: &HidEvent| counter.set(counter.get() + 1));

        for index in 0..8 {
            listener.on_input(&HidEvent {
                device: DeviceId {
                    vendor_id: 0,
                    product_id: 0,
                    location: "t".into(),
                },
                at: std::time::Instant::now(),
                index,
                usage: index + 1,
                kind: InputKind::ButtonPressed,
            });
        }
        assert_eq!(hits.get(), 2);
    }
}

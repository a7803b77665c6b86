//! Boundary notification sinks.
//!
//! Trait-based so the poller stays decoupled from whatever consumes the
//! notifications: a display, a channel to another thread, a log, or a test
//! capturing events in memory.

use std::sync::{Arc, Mutex};

use crate::{BoundaryEvent, CorrelationMethod};

/// Consumer of word-boundary notifications.
pub trait BoundarySink: Send + Sync {
    fn emit(&self, event: BoundaryEvent);
}

pub type BoundarySinkRef = Arc<dyn BoundarySink>;

/// Captures every event, for inspection in tests.
#[derive(Default)]
pub struct InMemorySink {
    events: Mutex<Vec<BoundaryEvent>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BoundaryEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_for(&self, method: CorrelationMethod) -> Vec<BoundaryEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.method == method)
            .cloned()
            .collect()
    }

    /// Word labels emitted by one method, in order.
    pub fn labels_for(&self, method: CorrelationMethod) -> Vec<String> {
        self.events_for(method)
            .into_iter()
            .map(|e| e.label)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl BoundarySink for InMemorySink {
    fn emit(&self, event: BoundaryEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Discards all events.
pub struct NullSink;

impl BoundarySink for NullSink {
    fn emit(&self, _event: BoundaryEvent) {
        // Intentionally empty
    }
}

/// Emits events as structured log lines.
pub struct LogSink;

impl BoundarySink for LogSink {
    fn emit(&self, event: BoundaryEvent) {
        tracing::info!(
            method = %event.method,
            tick = event.tick,
            observed_s = event.observed_s,
            word_start_s = event.word_start_s,
            word = %event.label,
            "word boundary"
        );
    }
}

/// Forwards events over a crossbeam channel to a display consumer.
/// Events are dropped (with a debug log) rather than blocking the poller.
pub struct ChannelSink {
    tx: crossbeam_channel::Sender<BoundaryEvent>,
}

impl ChannelSink {
    pub fn new(tx: crossbeam_channel::Sender<BoundaryEvent>) -> Self {
        Self { tx }
    }
}

impl BoundarySink for ChannelSink {
    fn emit(&self, event: BoundaryEvent) {
        if let Err(err) = self.tx.try_send(event) {
            tracing::debug!(%err, "boundary channel not accepting events");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(method: CorrelationMethod, label: &str) -> BoundaryEvent {
        BoundaryEvent {
            method,
            tick: 0,
            label: label.to_string(),
            observed_s: 0.0,
            word_start_s: 0.0,
        }
    }

    #[test]
    fn test_in_memory_sink_filters_by_method() {
        let sink = InMemorySink::new();
        sink.emit(event(CorrelationMethod::Session, "one"));
        sink.emit(event(CorrelationMethod::Spurt, "one"));
        sink.emit(event(CorrelationMethod::Session, "two"));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.labels_for(CorrelationMethod::Session), ["one", "two"]);
        assert_eq!(sink.labels_for(CorrelationMethod::Spurt), ["one"]);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_channel_sink_delivers_and_drops() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = ChannelSink::new(tx);

        sink.emit(event(CorrelationMethod::Session, "one"));
        // Channel full: dropped, not blocked.
        sink.emit(event(CorrelationMethod::Session, "two"));

        assert_eq!(rx.recv().unwrap().label, "one");
        assert!(rx.try_recv().is_err());
    }
}

//! Word-boundary synchronization.
//!
//! Correlates a streaming player's playback clock against the append-only
//! word timeline and emits a notification whenever playback reaches a new
//! word. Two deliberately redundant strategies run every iteration — one
//! keyed on total rendered audio, one on position within the current spurt
//! buffer — so their outputs can cross-validate each other.

mod correlate;
mod flow;
mod poller;
mod sink;

pub use correlate::{ClockSample, Correlator, SessionCorrelator, SpurtCorrelator};
pub use flow::FlowController;
pub use poller::{SyncPoller, SyncPollerConfig};
pub use sink::{BoundarySink, BoundarySinkRef, ChannelSink, InMemorySink, LogSink, NullSink};

use serde::Serialize;

/// Which correlation strategy produced a boundary notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationMethod {
    /// Elapsed rendered audio across the whole session.
    Session,
    /// Elapsed time within the currently playing spurt buffer.
    Spurt,
}

impl std::fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorrelationMethod::Session => write!(f, "session"),
            CorrelationMethod::Spurt => write!(f, "spurt"),
        }
    }
}

/// Playback has reached the start of a word.
#[derive(Debug, Clone, Serialize)]
pub struct BoundaryEvent {
    pub method: CorrelationMethod,
    /// Poll iteration that produced the event.
    pub tick: u64,
    /// Text of the word.
    pub label: String,
    /// Observed playback time (seconds, in the method's own frame).
    pub observed_s: f64,
    /// The word's nominal start time in the same frame.
    pub word_start_s: f64,
}

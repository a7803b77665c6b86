//! Append-only timeline of word events.
//!
//! Each word carries two independent timestamp pairs: session-relative
//! (seconds from the start of the whole synthesis session) and
//! spurt-relative (seconds from the start of its own phrase). The adapter
//! is the single writer; the sync poller reads by index and clears spurt
//! references during cleanup. Entries are never removed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use cadence_spurt::SpurtId;
use serde::{Deserialize, Serialize};

/// One recognized word with timing information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordEvent {
    /// Text of the word.
    pub label: String,
    /// Seconds from session start to word start.
    pub session_start: f64,
    /// Seconds from session start to word end.
    pub session_end: f64,
    /// Seconds from the word's own phrase start to word start.
    pub spurt_start: f64,
    /// Seconds from the word's own phrase start to word end.
    pub spurt_end: f64,
    /// Back-reference to the audio buffer carrying this word, if any.
    /// `None` in file mode and after buffer cleanup.
    pub spurt: Option<SpurtId>,
}

/// Ordered, index-addressable sequence of word events behind a mutex.
///
/// Single writer (the synthesis adapter), concurrent readers (the poller's
/// cursors). Reads clone entries out so no lock is held across correlation.
#[derive(Debug, Default)]
pub struct Timeline {
    words: Mutex<Vec<WordEvent>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a word event. Out-of-order session timestamps are logged and
    /// kept: once produced, a word is never dropped.
    pub fn append(&self, event: WordEvent) {
        let mut words = self.words.lock().unwrap();
        if let Some(last) = words.last() {
            if event.session_start < last.session_start {
                tracing::warn!(
                    label = %event.label,
                    session_start = event.session_start,
                    prev = last.session_start,
                    "word event appended out of session order"
                );
            }
        }
        tracing::debug!(
            label = %event.label,
            session_start = event.session_start,
            session_end = event.session_end,
            "word appended"
        );
        words.push(event);
    }

    pub fn len(&self) -> usize {
        self.words.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.lock().unwrap().is_empty()
    }

    /// Clone out the word at `idx`, if present.
    pub fn get(&self, idx: usize) -> Option<WordEvent> {
        self.words.lock().unwrap().get(idx).cloned()
    }

    /// Earliest entry whose spurt reference is still set.
    pub fn first_with_spurt(&self) -> Option<(usize, WordEvent)> {
        let words = self.words.lock().unwrap();
        words
            .iter()
            .enumerate()
            .find(|(_, w)| w.spurt.is_some())
            .map(|(i, w)| (i, w.clone()))
    }

    /// Clear the spurt reference on every entry whose spurt satisfies the
    /// predicate. Returns how many references were cleared.
    pub fn clear_refs_if(&self, pred: impl Fn(SpurtId) -> bool) -> usize {
        let mut words = self.words.lock().unwrap();
        let mut cleared = 0;
        for word in words.iter_mut() {
            if let Some(id) = word.spurt {
                if pred(id) {
                    word.spurt = None;
                    cleared += 1;
                }
            }
        }
        cleared
    }

    /// How many entries still reference the given spurt.
    pub fn spurt_references(&self, id: SpurtId) -> usize {
        let words = self.words.lock().unwrap();
        words.iter().filter(|w| w.spurt == Some(id)).count()
    }

    /// Snapshot of all entries, for diagnostics and tests.
    pub fn snapshot(&self) -> Vec<WordEvent> {
        self.words.lock().unwrap().clone()
    }
}

/// Cumulative audio-seconds produced so far in the session.
///
/// Converts per-phrase transcription offsets into session-relative
/// timestamps. Advanced by the adapter once per phrase, never decreases.
/// Stored as f64 bits in an atomic so the hot path takes no lock.
#[derive(Debug)]
pub struct SessionClock {
    bits: AtomicU64,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self {
            bits: AtomicU64::new(0f64.to_bits()),
        }
    }
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total audio-seconds so far.
    pub fn seconds(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Advance by `secs` (negative amounts are ignored). Returns the new
    /// total.
    pub fn advance(&self, secs: f64) -> f64 {
        if !(secs > 0.0) {
            return self.seconds();
        }
        let mut new = 0.0;
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                new = f64::from_bits(bits) + secs;
                Some(new.to_bits())
            });
        new
    }
}

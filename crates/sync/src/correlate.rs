//! Correlation strategies.
//!
//! Each strategy keeps its own cursor into the timeline and maps a playback
//! clock sample to the word currently being spoken. Cursors only move
//! forward; a word is emitted at most once per strategy.

use cadence_player::Player;
use cadence_spurt::{SpurtRegistry, SpurtStatus};
use cadence_timeline::Timeline;

use crate::{BoundaryEvent, CorrelationMethod};

/// One reading of the player clock, shared by both strategies within a
/// poll iteration.
#[derive(Debug, Clone, Copy)]
pub struct ClockSample {
    pub rendered_samples: u64,
    pub clock_samples: u64,
    pub sample_rate: u32,
    /// Poll iteration counter.
    pub tick: u64,
}

impl ClockSample {
    pub fn from_player(player: &dyn Player, tick: u64) -> Self {
        let clock = player.clock();
        Self {
            rendered_samples: clock.rendered_samples,
            clock_samples: clock.clock_samples,
            sample_rate: player.sample_rate(),
            tick,
        }
    }
}

/// Maps a clock sample to the currently spoken word, if it changed.
pub trait Correlator: Send {
    fn name(&self) -> &'static str;

    fn correlate(
        &mut self,
        timeline: &Timeline,
        registry: &SpurtRegistry,
        clock: &ClockSample,
    ) -> Option<BoundaryEvent>;
}

/// Session-relative strategy: compares total rendered audio against the
/// words' session timestamps.
#[derive(Debug, Default)]
pub struct SessionCorrelator {
    cursor: usize,
    last_emitted: Option<usize>,
}

impl SessionCorrelator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Correlator for SessionCorrelator {
    fn name(&self) -> &'static str {
        "session"
    }

    fn correlate(
        &mut self,
        timeline: &Timeline,
        _registry: &SpurtRegistry,
        clock: &ClockSample,
    ) -> Option<BoundaryEvent> {
        let t = clock.rendered_samples as f64 / clock.sample_rate as f64;

        let mut word = timeline.get(self.cursor)?;
        while word.session_end < t {
            match timeline.get(self.cursor + 1) {
                Some(next) => {
                    self.cursor += 1;
                    word = next;
                }
                None => return None,
            }
        }

        if word.session_start <= t && self.last_emitted != Some(self.cursor) {
            self.last_emitted = Some(self.cursor);
            return Some(BoundaryEvent {
                method: CorrelationMethod::Session,
                tick: clock.tick,
                label: word.label,
                observed_s: t,
                word_start_s: word.session_start,
            });
        }
        None
    }
}

/// Spurt-relative strategy: compares the player clock against the enqueue
/// stamp of the word's own spurt buffer.
///
/// Also performs buffer cleanup on spurt transitions: once the cursor moves
/// onto a new spurt and the previous one is fully played, the reference on
/// every entry whose spurt is `Played` is cleared and unreferenced spurts
/// are released.
#[derive(Debug, Default)]
pub struct SpurtCorrelator {
    cursor: usize,
    last_emitted: Option<usize>,
}

impl SpurtCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    fn elapsed_in_spurt(clock: &ClockSample, start_clock: u64) -> f64 {
        (clock.clock_samples as i64 - start_clock as i64) as f64 / clock.sample_rate as f64
    }
}

impl Correlator for SpurtCorrelator {
    fn name(&self) -> &'static str {
        "spurt"
    }

    fn correlate(
        &mut self,
        timeline: &Timeline,
        registry: &SpurtRegistry,
        clock: &ClockSample,
    ) -> Option<BoundaryEvent> {
        // Start from the earliest entry still holding a spurt reference,
        // without ever rewinding.
        let (first_idx, _) = timeline.first_with_spurt()?;
        if first_idx > self.cursor {
            self.cursor = first_idx;
        }

        // Skip entries whose reference was already cleared.
        let mut word = loop {
            let w = timeline.get(self.cursor)?;
            if w.spurt.is_some() {
                break w;
            }
            self.cursor += 1;
        };

        let spurt = word.spurt?;
        // Not stamped yet means the buffer is not actually queued; idle.
        let start_clock = registry.start_clock(spurt)?;
        let mut t = Self::elapsed_in_spurt(clock, start_clock);

        while word.spurt == Some(spurt) && word.spurt_end < t {
            match timeline.get(self.cursor + 1) {
                Some(next) => {
                    self.cursor += 1;
                    word = next;
                }
                None => return None,
            }
        }

        if word.spurt != Some(spurt) {
            // Landed on another buffer: only cross over once the previous
            // one has been fully consumed.
            if registry.status(spurt) != Some(SpurtStatus::Played) {
                return None;
            }
            let next_spurt = word.spurt?;
            let next_start = registry.start_clock(next_spurt)?;
            t = Self::elapsed_in_spurt(clock, next_start);

            let cleared =
                timeline.clear_refs_if(|id| registry.status(id) == Some(SpurtStatus::Played));
            if cleared > 0 {
                tracing::debug!(cleared, old = %spurt, new = %next_spurt, "spurt transition cleanup");
            }
            registry.release_if_unreferenced(spurt, timeline.spurt_references(spurt));
        }

        if word.spurt_start <= t && self.last_emitted != Some(self.cursor) {
            self.last_emitted = Some(self.cursor);
            return Some(BoundaryEvent {
                method: CorrelationMethod::Spurt,
                tick: clock.tick,
                label: word.label,
                observed_s: t,
                word_start_s: word.spurt_start,
            });
        }
        None
    }
}

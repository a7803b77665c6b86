//! Phrase-to-timeline adapter.
//!
//! Invoked once per synthesized phrase. Word items become timeline entries
//! with session-relative timestamps (local offset + cumulative session
//! clock); the phrase audio is queued on the player; the session clock
//! advances by the phrase duration.

use std::sync::Arc;

use cadence_player::Player;
use cadence_spurt::SpurtRegistry;
use cadence_timeline::{SessionClock, Timeline, WordEvent};

use crate::{Phrase, Result, TranscriptionKind};

/// Receives phrases from the synthesis engine and feeds the timeline,
/// registry and player. With no player (file mode) words are still
/// recorded, just without a spurt reference.
pub struct PhraseAdapter {
    timeline: Arc<Timeline>,
    registry: Arc<SpurtRegistry>,
    clock: Arc<SessionClock>,
    player: Option<Arc<dyn Player>>,
}

impl PhraseAdapter {
    pub fn new(
        timeline: Arc<Timeline>,
        registry: Arc<SpurtRegistry>,
        clock: Arc<SessionClock>,
        player: Option<Arc<dyn Player>>,
    ) -> Self {
        Self {
            timeline,
            registry,
            clock,
            player,
        }
    }

    /// Process one phrase: append word events, queue the audio, advance the
    /// session clock.
    ///
    /// Words are appended before the audio is queued. The spurt-relative
    /// correlator ignores spurts without a start stamp, so no reader can
    /// observe a queued spurt whose words are missing.
    pub fn on_phrase(&self, phrase: &Phrase) -> Result<()> {
        let spurt = match &self.player {
            Some(_) if !phrase.samples.is_empty() => Some(self.registry.create()),
            _ => None,
        };
        let base = self.clock.seconds();

        for (i, item) in phrase.items.iter().enumerate() {
            let (start, mut end) = (item.start_s, item.end_s);
            if end < start {
                tracing::warn!(
                    label = %item.label,
                    start,
                    end,
                    "transcription item ends before it starts, clamping"
                );
                end = start;
            }
            match item.kind {
                TranscriptionKind::Word => {
                    tracing::info!(start, end, word = %item.label, "word");
                    self.timeline.append(WordEvent {
                        label: item.label.clone(),
                        session_start: base + start,
                        session_end: base + end,
                        spurt_start: start,
                        spurt_end: end,
                        spurt,
                    });
                }
                TranscriptionKind::Phone => {
                    tracing::debug!(start, end, phone = %item.label, "phoneme");
                }
                TranscriptionKind::Mark => {
                    tracing::info!(start, end, marker = %item.label, "marker");
                }
                TranscriptionKind::Error => {
                    tracing::warn!(index = i, "could not retrieve transcription item");
                }
            }
        }

        if let (Some(player), Some(spurt)) = (&self.player, spurt) {
            player.enqueue(spurt, Arc::clone(&phrase.samples))?;
        }

        self.clock.advance(phrase.duration_secs());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TranscriptionItem;
    use cadence_player::SimPlayer;

    fn tone_phrase(words: &[&str], word_secs: f64, rate: u32) -> Phrase {
        let total = (words.len() as f64 * word_secs * rate as f64) as usize;
        Phrase {
            samples: vec![0.0f32; total].into(),
            sample_rate: rate,
            items: words
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    TranscriptionItem::word(*w, i as f64 * word_secs, (i + 1) as f64 * word_secs)
                })
                .collect(),
        }
    }

    fn setup() -> (Arc<Timeline>, Arc<SpurtRegistry>, Arc<SessionClock>) {
        (
            Arc::new(Timeline::new()),
            Arc::new(SpurtRegistry::new()),
            Arc::new(SessionClock::new()),
        )
    }

    #[test]
    fn test_three_phrases_get_session_offsets() {
        let (timeline, registry, clock) = setup();
        let player = Arc::new(SimPlayer::new(16000, registry.clone()));
        let adapter = PhraseAdapter::new(
            timeline.clone(),
            registry.clone(),
            clock.clone(),
            Some(player),
        );

        for word in ["one", "two", "three"] {
            adapter.on_phrase(&tone_phrase(&[word], 1.0, 16000)).unwrap();
        }

        let words = timeline.snapshot();
        assert_eq!(words.len(), 3);
        assert_eq!(words[1].label, "two");
        // Cumulative clock after phrase 1 is 1.0s, so "two" sits at 1.0..2.0.
        assert!((words[1].session_start - 1.0).abs() < 1e-9);
        assert!((words[1].session_end - 2.0).abs() < 1e-9);
        // Spurt-relative times stay local to the phrase.
        assert!((words[1].spurt_start - 0.0).abs() < 1e-9);
        assert!((words[1].spurt_end - 1.0).abs() < 1e-9);
        assert!((clock.seconds() - 3.0).abs() < 1e-9);

        // Each phrase got its own spurt, queued back to back.
        assert_eq!(registry.len(), 3);
        let b = words[1].spurt.unwrap();
        assert_eq!(registry.start_clock(b), Some(16000));
    }

    #[test]
    fn test_empty_transcription_still_advances_clock() {
        let (timeline, registry, clock) = setup();
        let player = Arc::new(SimPlayer::new(16000, registry.clone()));
        let adapter = PhraseAdapter::new(
            timeline.clone(),
            registry.clone(),
            clock.clone(),
            Some(player),
        );

        let phrase = Phrase {
            samples: vec![0.0f32; 8000].into(),
            sample_rate: 16000,
            items: Vec::new(),
        };
        adapter.on_phrase(&phrase).unwrap();

        assert!(timeline.is_empty());
        assert!((clock.seconds() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_error_items_produce_no_word_events() {
        let (timeline, registry, clock) = setup();
        let adapter = PhraseAdapter::new(timeline.clone(), registry, clock, None);

        let phrase = Phrase {
            samples: vec![0.0f32; 1600].into(),
            sample_rate: 16000,
            items: vec![
                TranscriptionItem {
                    kind: TranscriptionKind::Error,
                    start_s: 0.0,
                    end_s: 0.0,
                    label: String::new(),
                },
                TranscriptionItem::word("kept", 0.0, 0.1),
            ],
        };
        adapter.on_phrase(&phrase).unwrap();

        let words = timeline.snapshot();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].label, "kept");
    }

    #[test]
    fn test_file_mode_records_words_without_spurts() {
        let (timeline, registry, clock) = setup();
        let adapter = PhraseAdapter::new(timeline.clone(), registry.clone(), clock, None);

        adapter
            .on_phrase(&tone_phrase(&["hello", "there"], 0.5, 16000))
            .unwrap();

        assert_eq!(registry.len(), 0);
        assert!(timeline.snapshot().iter().all(|w| w.spurt.is_none()));
    }
}

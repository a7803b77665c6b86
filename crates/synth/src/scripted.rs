//! Deterministic stand-in synthesizer.
//!
//! Gives every word a fixed duration and renders a distinct tone per word,
//! so playback is audible and word timings are exactly predictable. Real
//! voice synthesis stays behind the [`SynthesisEngine`] trait.

use std::f32::consts::TAU;
use std::sync::Arc;

use crate::{Phrase, Result, SynthesisEngine, TranscriptionItem, TranscriptionKind};

const BASE_FREQ_HZ: f32 = 220.0;
const STEP_FREQ_HZ: f32 = 40.0;
const AMPLITUDE: f32 = 0.2;

/// Engine that "synthesizes" one phrase per input line.
pub struct ScriptedEngine {
    sample_rate: u32,
    word_secs: f64,
    phrase_count: u64,
}

impl ScriptedEngine {
    pub fn new(sample_rate: u32, word_secs: f64) -> Self {
        Self {
            sample_rate,
            word_secs,
            phrase_count: 0,
        }
    }

    fn render(&self, word_count: usize) -> Arc<[f32]> {
        let per_word = (self.word_secs * self.sample_rate as f64) as usize;
        let mut samples = Vec::with_capacity(per_word * word_count);
        for w in 0..word_count {
            let freq = BASE_FREQ_HZ + STEP_FREQ_HZ * (w % 8) as f32;
            for n in 0..per_word {
                let t = n as f32 / self.sample_rate as f32;
                samples.push(AMPLITUDE * (TAU * freq * t).sin());
            }
        }
        samples.into()
    }
}

impl SynthesisEngine for ScriptedEngine {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn speak(&mut self, text: &str, _flush: bool, sink: &mut dyn FnMut(Phrase)) -> Result<()> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Ok(());
        }

        self.phrase_count += 1;
        let mut items = Vec::with_capacity(words.len() + 1);
        items.push(TranscriptionItem {
            kind: TranscriptionKind::Mark,
            start_s: 0.0,
            end_s: 0.0,
            label: format!("phrase-{}", self.phrase_count),
        });
        for (i, word) in words.iter().enumerate() {
            items.push(TranscriptionItem::word(
                *word,
                i as f64 * self.word_secs,
                (i + 1) as f64 * self.word_secs,
            ));
        }

        sink(Phrase {
            samples: self.render(words.len()),
            sample_rate: self.sample_rate,
            items,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_phrase_per_line_with_word_timings() {
        let mut engine = ScriptedEngine::new(16000, 0.25);
        let mut phrases = Vec::new();
        engine
            .speak("hello brave world", false, &mut |p| phrases.push(p))
            .unwrap();

        assert_eq!(phrases.len(), 1);
        let phrase = &phrases[0];
        assert_eq!(phrase.samples.len(), 3 * 4000);
        assert!((phrase.duration_secs() - 0.75).abs() < 1e-9);

        let words: Vec<_> = phrase
            .items
            .iter()
            .filter(|i| i.kind == TranscriptionKind::Word)
            .collect();
        assert_eq!(words.len(), 3);
        assert_eq!(words[1].label, "brave");
        assert!((words[1].start_s - 0.25).abs() < 1e-9);
        assert!((words[1].end_s - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_blank_input_emits_nothing() {
        let mut engine = ScriptedEngine::new(16000, 0.25);
        let mut count = 0;
        engine.speak("   ", true, &mut |_| count += 1).unwrap();
        assert_eq!(count, 0);
    }
}

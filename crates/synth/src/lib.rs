//! Synthesis engine seam.
//!
//! The voice engine is an external collaborator: it accepts text and hands
//! back one [`Phrase`] per synthesized chunk, carrying raw samples plus an
//! ordered transcription (phones, words, markers). [`adapter::PhraseAdapter`]
//! turns those phrases into timeline entries and queued audio;
//! [`ScriptedEngine`] is a deterministic stand-in used by the CLI and tests.

mod adapter;
mod scripted;

pub use adapter::PhraseAdapter;
pub use scripted::ScriptedEngine;

use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("engine failure: {0}")]
    Engine(String),
    #[error("playback failure: {0}")]
    Playback(#[from] cadence_player::PlayerError),
}

pub type Result<T> = std::result::Result<T, SynthError>;

/// Kind of one transcription item within a phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionKind {
    Phone,
    Word,
    Mark,
    Error,
}

/// One transcription item, timed relative to the phrase start.
#[derive(Debug, Clone)]
pub struct TranscriptionItem {
    pub kind: TranscriptionKind,
    pub start_s: f64,
    pub end_s: f64,
    pub label: String,
}

impl TranscriptionItem {
    pub fn word(label: impl Into<String>, start_s: f64, end_s: f64) -> Self {
        Self {
            kind: TranscriptionKind::Word,
            start_s,
            end_s,
            label: label.into(),
        }
    }
}

/// One synthesized phrase: audio plus its ordered transcription.
#[derive(Debug, Clone)]
pub struct Phrase {
    pub samples: Arc<[f32]>,
    pub sample_rate: u32,
    pub items: Vec<TranscriptionItem>,
}

impl Phrase {
    /// Audio duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Text-to-speech engine collaborator.
///
/// Implementations deliver phrases through the sink as they are produced;
/// `flush` signals end of input so any buffered text is synthesized.
pub trait SynthesisEngine: Send {
    fn sample_rate(&self) -> u32;

    fn speak(
        &mut self,
        text: &str,
        flush: bool,
        sink: &mut dyn FnMut(Phrase),
    ) -> Result<()>;
}

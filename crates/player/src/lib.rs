//! Audio playback seam.
//!
//! The synchronization core never talks to a device directly; it consumes
//! the [`Player`] trait. [`SimPlayer`] gives tests a hand-cranked clock,
//! [`CpalPlayer`] plays through the default output device.

mod sim;
mod stream;

pub use sim::SimPlayer;
pub use stream::{CpalOutput, CpalPlayer};

use std::sync::Arc;

use cadence_spurt::SpurtId;

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("no output device available")]
    NoDevice,
    #[error("stream error: {0}")]
    StreamError(String),
    #[error("device error: {0}")]
    DeviceError(#[from] cpal::DevicesError),
    #[error("build stream error: {0}")]
    BuildStreamError(#[from] cpal::BuildStreamError),
    #[error("play stream error: {0}")]
    PlayStreamError(#[from] cpal::PlayStreamError),
}

pub type Result<T> = std::result::Result<T, PlayerError>;

/// Snapshot of the player's playback position, taken once per poll
/// iteration so both correlation methods see the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerClock {
    /// Total samples actually rendered since the stream started.
    pub rendered_samples: u64,
    /// Player clock in samples, comparable to spurt start stamps.
    pub clock_samples: u64,
}

/// Streaming audio player that consumes queued spurt buffers.
///
/// `enqueue` must stamp the spurt's player-side start position in the
/// registry (cumulative samples queued before it) and the implementation
/// must mark spurts `Playing`/`Played` as its clock moves through them.
pub trait Player: Send + Sync {
    /// Queue one spurt's samples for playback.
    fn enqueue(&self, spurt: SpurtId, samples: Arc<[f32]>) -> Result<()>;

    /// True while queued audio remains unrendered.
    fn is_busy(&self) -> bool;

    fn is_paused(&self) -> bool;

    /// Idempotent; pausing a paused player is a no-op.
    fn pause(&self);

    fn resume(&self);

    /// Current playback position.
    fn clock(&self) -> PlayerClock;

    fn sample_rate(&self) -> u32;
}

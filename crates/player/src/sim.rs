//! Deterministic player for tests: the clock only moves when the test
//! cranks it with [`SimPlayer::advance_samples`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cadence_spurt::{SpurtId, SpurtRegistry};

use crate::{Player, PlayerClock, Result};

#[derive(Debug)]
struct SimClip {
    spurt: SpurtId,
    start: u64,
    len: u64,
}

#[derive(Debug, Default)]
struct SimState {
    clips: Vec<SimClip>,
    queued: u64,
    rendered: u64,
}

/// In-memory player with a manually advanced clock.
pub struct SimPlayer {
    registry: Arc<SpurtRegistry>,
    sample_rate: u32,
    state: Mutex<SimState>,
    paused: AtomicBool,
}

impl SimPlayer {
    pub fn new(sample_rate: u32, registry: Arc<SpurtRegistry>) -> Self {
        Self {
            registry,
            sample_rate,
            state: Mutex::new(SimState::default()),
            paused: AtomicBool::new(false),
        }
    }

    /// Render `n` samples of queued audio (clamped to what is queued).
    /// No-op while paused. Updates spurt statuses as the clock crosses
    /// buffer boundaries.
    pub fn advance_samples(&self, n: u64) {
        if self.paused.load(Ordering::Acquire) {
            return;
        }
        let mut state = self.state.lock().unwrap();
        state.rendered = (state.rendered + n).min(state.queued);
        let rendered = state.rendered;
        for clip in &state.clips {
            if rendered >= clip.start + clip.len {
                self.registry.mark_played(clip.spurt);
            } else if rendered > clip.start {
                self.registry.mark_playing(clip.spurt);
            }
        }
    }

    /// Render `secs` worth of samples.
    pub fn advance_secs(&self, secs: f64) {
        self.advance_samples((secs * self.sample_rate as f64).round() as u64);
    }
}

impl Player for SimPlayer {
    fn enqueue(&self, spurt: SpurtId, samples: Arc<[f32]>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let start = state.queued;
        let len = samples.len() as u64;
        state.clips.push(SimClip { spurt, start, len });
        state.queued += len;
        self.registry.mark_queued(spurt, start);
        Ok(())
    }

    fn is_busy(&self) -> bool {
        let state = self.state.lock().unwrap();
        state.rendered < state.queued
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    fn clock(&self) -> PlayerClock {
        let state = self.state.lock().unwrap();
        PlayerClock {
            rendered_samples: state.rendered,
            clock_samples: state.rendered,
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_spurt::SpurtStatus;

    #[test]
    fn test_clock_tracks_advance() {
        let registry = Arc::new(SpurtRegistry::new());
        let player = SimPlayer::new(16000, registry.clone());

        let spurt = registry.create();
        player.enqueue(spurt, vec![0.0f32; 16000].into()).unwrap();
        assert!(player.is_busy());
        assert_eq!(registry.start_clock(spurt), Some(0));

        player.advance_secs(0.5);
        assert_eq!(player.clock().rendered_samples, 8000);
        assert_eq!(registry.status(spurt), Some(SpurtStatus::Playing));

        player.advance_secs(0.5);
        assert!(!player.is_busy());
        assert_eq!(registry.status(spurt), Some(SpurtStatus::Played));

        // Clock clamps at the queued total.
        player.advance_secs(10.0);
        assert_eq!(player.clock().rendered_samples, 16000);
    }

    #[test]
    fn test_second_clip_gets_cumulative_start_stamp() {
        let registry = Arc::new(SpurtRegistry::new());
        let player = SimPlayer::new(16000, registry.clone());

        let a = registry.create();
        let b = registry.create();
        player.enqueue(a, vec![0.0f32; 16000].into()).unwrap();
        player.enqueue(b, vec![0.0f32; 8000].into()).unwrap();

        assert_eq!(registry.start_clock(a), Some(0));
        assert_eq!(registry.start_clock(b), Some(16000));
    }

    #[test]
    fn test_pause_freezes_the_clock() {
        let registry = Arc::new(SpurtRegistry::new());
        let player = SimPlayer::new(16000, registry.clone());
        let spurt = registry.create();
        player.enqueue(spurt, vec![0.0f32; 16000].into()).unwrap();

        player.pause();
        assert!(player.is_paused());
        player.advance_secs(1.0);
        assert_eq!(player.clock().rendered_samples, 0);

        player.resume();
        player.advance_secs(1.0);
        assert_eq!(player.clock().rendered_samples, 16000);
    }
}

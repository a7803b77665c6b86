//! cpal-backed playback.
//!
//! The output stream is `!Send`, so it stays with [`CpalOutput`] on the
//! thread that created it; [`CpalPlayer`] is the cloneable handle the
//! adapter and poller share. Pausing renders silence without consuming the
//! queue, which freezes the playback clock.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cadence_spurt::{SpurtId, SpurtRegistry};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::{Player, PlayerClock, PlayerError, Result};

struct Clip {
    spurt: SpurtId,
    samples: Arc<[f32]>,
    consumed: usize,
    started: bool,
}

#[derive(Default)]
struct Queue {
    clips: VecDeque<Clip>,
    last_sample: f32,
}

struct Shared {
    queue: Mutex<Queue>,
    rendered: AtomicU64,
    queued: AtomicU64,
    paused: AtomicBool,
    registry: Arc<SpurtRegistry>,
}

/// Send + Sync handle onto the running output stream.
#[derive(Clone)]
pub struct CpalPlayer {
    shared: Arc<Shared>,
    sample_rate: u32,
}

/// Owns the cpal stream; keep it alive for as long as audio should play.
pub struct CpalOutput {
    _stream: cpal::Stream,
    player: CpalPlayer,
}

impl CpalOutput {
    /// Open the default output device at (or as close as possible to) the
    /// source sample rate and start the stream.
    pub fn start(source_rate: u32, registry: Arc<SpurtRegistry>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(PlayerError::NoDevice)?;

        let mut configs = device
            .supported_output_configs()
            .map_err(|e| PlayerError::StreamError(e.to_string()))?;
        let config_range = match configs.find(|c| c.channels() == 1) {
            Some(range) => range,
            None => device
                .supported_output_configs()
                .map_err(|e| PlayerError::StreamError(e.to_string()))?
                .next()
                .ok_or(PlayerError::NoDevice)?,
        };

        let sample_rate = cpal::SampleRate(source_rate).clamp(
            config_range.min_sample_rate(),
            config_range.max_sample_rate(),
        );
        let config: cpal::StreamConfig = config_range.with_sample_rate(sample_rate).into();
        let channels = config.channels as usize;

        if config.sample_rate.0 != source_rate {
            tracing::warn!(
                device_rate = config.sample_rate.0,
                source_rate,
                "output device rate differs from source, playback will be pitch-shifted"
            );
        }
        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            rate = config.sample_rate.0,
            channels,
            "output stream starting"
        );

        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue::default()),
            rendered: AtomicU64::new(0),
            queued: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            registry,
        });
        let cb_shared = Arc::clone(&shared);

        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                fill_output(&cb_shared, data, channels);
            },
            |err| tracing::error!(%err, "output stream error"),
            None,
        )?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            player: CpalPlayer {
                shared,
                sample_rate: source_rate,
            },
        })
    }

    /// Cloneable handle for the adapter and the sync poller.
    pub fn player(&self) -> CpalPlayer {
        self.player.clone()
    }
}

fn fill_output(shared: &Shared, data: &mut [f32], channels: usize) {
    data.fill(0.0);
    if shared.paused.load(Ordering::Acquire) {
        return;
    }

    let mut queue = shared.queue.lock().unwrap();
    let mut last = queue.last_sample;
    let mut rendered = 0u64;

    for (idx, slot) in data.iter_mut().enumerate() {
        if idx % channels == 0 {
            let sample = loop {
                let Some(front) = queue.clips.front_mut() else {
                    break None;
                };
                if front.consumed >= front.samples.len() {
                    let done = queue.clips.pop_front().unwrap();
                    shared.registry.mark_played(done.spurt);
                    continue;
                }
                if !front.started {
                    front.started = true;
                    shared.registry.mark_playing(front.spurt);
                }
                let v = front.samples[front.consumed];
                front.consumed += 1;
                break Some(v);
            };
            match sample {
                Some(v) => {
                    last = v;
                    *slot = v;
                    rendered += 1;
                }
                None => break,
            }
        } else {
            *slot = last;
        }
    }

    // A clip fully consumed on the exact buffer boundary is finalized on
    // the next callback; flush it now if the queue head is exhausted.
    while let Some(front) = queue.clips.front() {
        if front.consumed >= front.samples.len() {
            let done = queue.clips.pop_front().unwrap();
            shared.registry.mark_played(done.spurt);
        } else {
            break;
        }
    }

    queue.last_sample = last;
    shared.rendered.fetch_add(rendered, Ordering::AcqRel);
}

impl Player for CpalPlayer {
    fn enqueue(&self, spurt: SpurtId, samples: Arc<[f32]>) -> Result<()> {
        let len = samples.len() as u64;
        let mut queue = self.shared.queue.lock().unwrap();
        // Stamp before the clip becomes consumable so the clock can never
        // pass an unstamped spurt.
        let start = self.shared.queued.fetch_add(len, Ordering::AcqRel);
        self.shared.registry.mark_queued(spurt, start);
        queue.clips.push_back(Clip {
            spurt,
            samples,
            consumed: 0,
            started: false,
        });
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.shared.rendered.load(Ordering::Acquire) < self.shared.queued.load(Ordering::Acquire)
    }

    fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
    }

    fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
    }

    fn clock(&self) -> PlayerClock {
        let rendered = self.shared.rendered.load(Ordering::Acquire);
        PlayerClock {
            rendered_samples: rendered,
            clock_samples: rendered,
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

//! Background synchronization poller.
//!
//! Owns a thread that repeatedly samples the player clock, runs both
//! correlation strategies against the word timeline and forwards every
//! boundary they produce to the sink. Idle (nothing queued or paused)
//! iterations only sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cadence_player::Player;
use cadence_spurt::SpurtRegistry;
use cadence_timeline::Timeline;

use crate::{
    BoundarySinkRef, ClockSample, Correlator, FlowController, SessionCorrelator, SpurtCorrelator,
};

#[derive(Debug, Clone)]
pub struct SyncPollerConfig {
    /// Sleep between iterations.
    pub tick: Duration,
    /// Run a flow-control pause cycle every this many iterations
    /// (0 disables flow control).
    pub flow_interval_ticks: u64,
    /// How long each flow-control pause holds the player.
    pub flow_pause: Duration,
}

impl Default for SyncPollerConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1),
            flow_interval_ticks: 1200,
            flow_pause: Duration::from_millis(100),
        }
    }
}

/// Handle to the polling thread. Stops and joins on [`stop`](Self::stop)
/// or drop.
pub struct SyncPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncPoller {
    pub fn start(
        timeline: Arc<Timeline>,
        registry: Arc<SpurtRegistry>,
        player: Arc<dyn Player>,
        sink: BoundarySinkRef,
        config: SyncPollerConfig,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = std::thread::spawn(move || {
            tracing::debug!(?config.tick, config.flow_interval_ticks, "sync poller started");
            let mut session = SessionCorrelator::new();
            let mut spurt = SpurtCorrelator::new();
            let mut flow = FlowController::new(config.flow_interval_ticks, config.flow_pause);
            let mut tick: u64 = 0;

            while !stop_flag.load(Ordering::Acquire) {
                if player.is_busy() && !player.is_paused() {
                    tick += 1;
                    let clock = ClockSample::from_player(player.as_ref(), tick);
                    if let Some(ev) = session.correlate(&timeline, &registry, &clock) {
                        sink.emit(ev);
                    }
                    if let Some(ev) = spurt.correlate(&timeline, &registry, &clock) {
                        sink.emit(ev);
                    }
                    flow.on_tick(player.as_ref());
                }
                std::thread::sleep(config.tick);
            }

            // Shutdown: nothing will play the remaining buffers.
            let cleared = timeline.clear_refs_if(|_| true);
            let dropped = registry.drain();
            tracing::debug!(tick, cleared, dropped, "sync poller stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the thread to stop and wait for it to finish.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("sync poller thread panicked");
            }
        }
    }
}

impl Drop for SyncPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CorrelationMethod, InMemorySink};
    use cadence_player::SimPlayer;
    use cadence_timeline::WordEvent;

    #[test]
    fn test_poller_emits_boundaries_and_cleans_up_on_stop() {
        let timeline = Arc::new(Timeline::new());
        let registry = Arc::new(SpurtRegistry::new());
        let player = Arc::new(SimPlayer::new(16000, registry.clone()));
        let sink = Arc::new(InMemorySink::new());

        let spurt = registry.create();
        timeline.append(WordEvent {
            label: "hello".into(),
            session_start: 0.0,
            session_end: 1.0,
            spurt_start: 0.0,
            spurt_end: 1.0,
            spurt: Some(spurt),
        });
        player.enqueue(spurt, vec![0.0f32; 16000].into()).unwrap();

        let mut poller = SyncPoller::start(
            timeline.clone(),
            registry.clone(),
            player.clone(),
            sink.clone(),
            SyncPollerConfig {
                tick: Duration::from_millis(1),
                flow_interval_ticks: 0,
                flow_pause: Duration::ZERO,
            },
        );

        player.advance_secs(0.5);
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while sink.len() < 2 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        poller.stop();
        assert_eq!(sink.labels_for(CorrelationMethod::Session), ["hello"]);
        assert_eq!(sink.labels_for(CorrelationMethod::Spurt), ["hello"]);

        // Shutdown released everything still referenced.
        assert_eq!(timeline.spurt_references(spurt), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_idle_poller_stops_cleanly() {
        let timeline = Arc::new(Timeline::new());
        let registry = Arc::new(SpurtRegistry::new());
        let player = Arc::new(SimPlayer::new(16000, registry.clone()));

        let poller = SyncPoller::start(
            timeline,
            registry,
            player,
            Arc::new(InMemorySink::new()),
            SyncPollerConfig::default(),
        );
        // Drop stops and joins.
        drop(poller);
    }
}

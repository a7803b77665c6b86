//! Periodic flow control.
//!
//! Every `interval_ticks` poll iterations the player is paused, held for a
//! short beat and resumed, exercising the pause path and giving the output
//! queue a chance to settle. Pausing is skipped when the player is already
//! paused from elsewhere, so an external pause is never clobbered by the
//! matching resume.

use std::time::Duration;

use cadence_player::Player;

pub struct FlowController {
    interval_ticks: u64,
    pause_for: Duration,
    ticks: u64,
}

impl FlowController {
    pub fn new(interval_ticks: u64, pause_for: Duration) -> Self {
        Self {
            interval_ticks,
            pause_for,
            ticks: 0,
        }
    }

    /// Count one poll iteration; on every interval boundary, pause the
    /// player, wait, resume. Returns true if a pause cycle ran.
    pub fn on_tick(&mut self, player: &dyn Player) -> bool {
        self.ticks += 1;
        if self.interval_ticks == 0 || self.ticks % self.interval_ticks != 0 {
            return false;
        }
        if player.is_paused() {
            tracing::debug!("player already paused, skipping flow cycle");
            return false;
        }
        tracing::debug!(tick = self.ticks, "flow control pause");
        player.pause();
        std::thread::sleep(self.pause_for);
        player.resume();
        true
    }
}

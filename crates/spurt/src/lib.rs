//! Spurt buffer registry.
//!
//! A "spurt" is one synthesized phrase's audio, queued and played as a
//! discrete unit. The registry owns each spurt's lifecycle state and its
//! player-side start stamp. Word events refer to spurts by id only; a
//! released spurt reads as gone instead of dangling.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Opaque handle to one queued audio phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpurtId(u64);

impl std::fmt::Display for SpurtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spurt#{}", self.0)
    }
}

/// Playback lifecycle of a spurt buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpurtStatus {
    /// Created and handed to the player queue.
    Queued,
    /// The player clock is currently inside this buffer.
    Playing,
    /// Fully consumed by the player.
    Played,
    /// Dropped without being played (e.g. shutdown).
    Discarded,
}

#[derive(Debug)]
struct SpurtSlot {
    status: SpurtStatus,
    /// Player clock (samples) at which this buffer starts, set on enqueue.
    start_clock: Option<u64>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    slots: HashMap<u64, SpurtSlot>,
    next_id: u64,
}

/// Tracks which spurts exist and where they are in their lifecycle.
///
/// Written by the synthesis adapter (create/queue), the player (playing/
/// played) and the sync poller (release), so every transition goes through
/// one mutex.
#[derive(Debug, Default)]
pub struct SpurtRegistry {
    inner: Mutex<RegistryInner>,
}

impl SpurtRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new spurt. Starts out `Queued` with no start stamp.
    pub fn create(&self) -> SpurtId {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.slots.insert(
            id,
            SpurtSlot {
                status: SpurtStatus::Queued,
                start_clock: None,
            },
        );
        SpurtId(id)
    }

    /// Record the player-side start stamp once the buffer is actually cued.
    ///
    /// The stamp is the cumulative sample count queued before this buffer,
    /// in the same unit as the player clock.
    pub fn mark_queued(&self, id: SpurtId, start_clock: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.slots.get_mut(&id.0) {
            slot.status = SpurtStatus::Queued;
            slot.start_clock = Some(start_clock);
        }
    }

    pub fn mark_playing(&self, id: SpurtId) {
        self.transition(id, SpurtStatus::Playing);
    }

    pub fn mark_played(&self, id: SpurtId) {
        self.transition(id, SpurtStatus::Played);
    }

    pub fn mark_discarded(&self, id: SpurtId) {
        self.transition(id, SpurtStatus::Discarded);
    }

    fn transition(&self, id: SpurtId, status: SpurtStatus) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(slot) = inner.slots.get_mut(&id.0) {
            if slot.status != status {
                tracing::trace!(%id, from = ?slot.status, to = ?status, "spurt transition");
                slot.status = status;
            }
        }
    }

    /// Current status, or `None` if the spurt was released.
    pub fn status(&self, id: SpurtId) -> Option<SpurtStatus> {
        self.inner.lock().unwrap().slots.get(&id.0).map(|s| s.status)
    }

    /// Player-side start stamp, or `None` if not yet queued (or released).
    pub fn start_clock(&self, id: SpurtId) -> Option<u64> {
        self.inner
            .lock()
            .unwrap()
            .slots
            .get(&id.0)
            .and_then(|s| s.start_clock)
    }

    /// Release the spurt if it is fully played and no word event still
    /// references it. `refs` is the caller's reference count (the registry
    /// does not know about the timeline).
    ///
    /// Returns true if the slot was removed.
    pub fn release_if_unreferenced(&self, id: SpurtId, refs: usize) -> bool {
        if refs > 0 {
            return false;
        }
        let mut inner = self.inner.lock().unwrap();
        match inner.slots.get(&id.0) {
            Some(slot) if slot.status == SpurtStatus::Played => {
                inner.slots.remove(&id.0);
                tracing::debug!(%id, "spurt released");
                true
            }
            _ => false,
        }
    }

    /// Discard and remove every remaining spurt. Shutdown path: whatever
    /// is still queued will never play. Returns how many were dropped.
    pub fn drain(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let count = inner.slots.len();
        if count > 0 {
            tracing::debug!(count, "draining unplayed spurts");
        }
        inner.slots.clear();
        count
    }

    /// Number of live (unreleased) spurts.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let registry = SpurtRegistry::new();
        let id = registry.create();

        assert_eq!(registry.status(id), Some(SpurtStatus::Queued));
        assert_eq!(registry.start_clock(id), None);

        registry.mark_queued(id, 16000);
        assert_eq!(registry.start_clock(id), Some(16000));

        registry.mark_playing(id);
        assert_eq!(registry.status(id), Some(SpurtStatus::Playing));

        registry.mark_played(id);
        assert_eq!(registry.status(id), Some(SpurtStatus::Played));
    }

    #[test]
    fn test_release_requires_played_and_unreferenced() {
        let registry = SpurtRegistry::new();
        let id = registry.create();
        registry.mark_queued(id, 0);

        // Still queued: not releasable even with zero refs.
        assert!(!registry.release_if_unreferenced(id, 0));

        registry.mark_played(id);
        // Played but referenced: keep.
        assert!(!registry.release_if_unreferenced(id, 2));
        assert_eq!(registry.len(), 1);

        // Played and unreferenced: gone.
        assert!(registry.release_if_unreferenced(id, 0));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_released_spurt_reads_as_gone() {
        let registry = SpurtRegistry::new();
        let id = registry.create();
        registry.mark_queued(id, 100);
        registry.mark_played(id);
        assert!(registry.release_if_unreferenced(id, 0));

        assert_eq!(registry.status(id), None);
        assert_eq!(registry.start_clock(id), None);
        // Transitions on a gone spurt are no-ops, not panics.
        registry.mark_played(id);
        assert_eq!(registry.status(id), None);
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = SpurtRegistry::new();
        let a = registry.create();
        let b = registry.create();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }
}

//! Per-player reuse timers.
//!
//! The tracker itself only stores expiries. Check-then-mark atomicity comes
//! from the pipeline holding the player's lock across both calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use scroll_core::PlayerId;

use crate::utils::{Clock, Timestamp};

pub struct CooldownTracker {
    clock: Arc<dyn Clock>,
    expiries: Mutex<HashMap<PlayerId, Timestamp>>,
}

impl CooldownTracker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            expiries: Mutex::new(HashMap::new()),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// True when the player has no entry or its expiry is not in the future.
    pub fn is_ready(&self, player: PlayerId) -> bool {
        self.remaining(player).is_none()
    }

    /// Time left on the player's cooldown. Expired entries are evicted here.
    pub fn remaining(&self, player: PlayerId) -> Option<Duration> {
        let now = self.clock.now();
        let mut expiries = self.expiries();
        match expiries.get(&player) {
            Some(&expiry) if expiry > now => Some(expiry.saturating_duration_since(now)),
            Some(_) => {
                expiries.remove(&player);
                None
            }
            None => None,
        }
    }

    pub fn expiry(&self, player: PlayerId) -> Option<Timestamp> {
        self.expiries().get(&player).copied()
    }

    /// Start a cooldown of `duration` from now, replacing any existing one.
    ///
    /// Expired entries of other players are evicted on the way, so the table
    /// never holds more than the cooldowns still running plus this one.
    pub fn mark_used(&self, player: PlayerId, duration: Duration) {
        let now = self.clock.now();
        let expiry = now.saturating_add(duration);
        let mut expiries = self.expiries();
        let before = expiries.len();
        expiries.retain(|_, expiry| *expiry > now);
        let evicted = before - expiries.len();
        expiries.insert(player, expiry);
        drop(expiries);

        tracing::debug!(player = %player, evicted, "Cooldown set until {}", expiry);
    }

    pub fn len(&self) -> usize {
        self.expiries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Plain timestamps cannot be left half-updated by a panic.
    fn expiries(&self) -> MutexGuard<'_, HashMap<PlayerId, Timestamp>> {
        self.expiries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whole seconds left, rounded up so a pending cooldown never reports zero.
pub fn remaining_secs(remaining: Duration) -> u64 {
    let secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

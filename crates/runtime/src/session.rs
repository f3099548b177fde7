//! Player presence, watched by in-flight teleports.
//!
//! Each online player owns a `watch` channel. Requests subscribe to it so a
//! disconnect or movement can interrupt them while they wait.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use scroll_core::PlayerId;
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Presence {
    pub online: bool,
    /// Incremented on every movement report.
    pub moves: u64,
}

/// What ended a wait on a [`SessionWatch`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    Moved,
    Disconnected,
}

#[derive(Default)]
pub struct SessionTracker {
    sessions: Mutex<HashMap<PlayerId, watch::Sender<Presence>>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the player online. A repeated join keeps the movement count, so
    /// watchers only see movement that actually happened.
    pub fn join(&self, player: PlayerId) {
        let mut sessions = self.sessions();
        match sessions.get(&player) {
            Some(sender) => {
                sender.send_if_modified(|presence| {
                    let changed = !presence.online;
                    presence.online = true;
                    changed
                });
            }
            None => {
                let presence = Presence {
                    online: true,
                    moves: 0,
                };
                sessions.insert(player, watch::channel(presence).0);
            }
        }
        tracing::debug!(player = %player, "Joined");
    }

    pub fn leave(&self, player: PlayerId) {
        if let Some(sender) = self.sessions().remove(&player) {
            sender.send_modify(|presence| presence.online = false);
            tracing::debug!(player = %player, "Left");
        }
    }

    pub fn moved(&self, player: PlayerId) {
        if let Some(sender) = self.sessions().get(&player) {
            sender.send_modify(|presence| presence.moves += 1);
        }
    }

    pub fn is_online(&self, player: PlayerId) -> bool {
        self.sessions().contains_key(&player)
    }

    pub fn online(&self) -> Vec<PlayerId> {
        let mut players: Vec<_> = self.sessions().keys().copied().collect();
        players.sort_unstable();
        players
    }

    /// Subscribe to the player's presence, `None` when offline.
    pub fn watch(&self, player: PlayerId) -> Option<SessionWatch> {
        self.sessions().get(&player).map(|sender| {
            let receiver = sender.subscribe();
            let moves = receiver.borrow().moves;
            SessionWatch { receiver, moves }
        })
    }

    // Senders carry no invariant a panic could break.
    fn sessions(&self) -> MutexGuard<'_, HashMap<PlayerId, watch::Sender<Presence>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A request's view of one player's presence since it subscribed.
pub struct SessionWatch {
    receiver: watch::Receiver<Presence>,
    moves: u64,
}

impl SessionWatch {
    /// Resolves once the player goes offline.
    pub async fn disconnected(&mut self) {
        // A dropped sender also means the session is gone.
        let _ = self.receiver.wait_for(|presence| !presence.online).await;
    }

    /// Resolves on disconnect, or on movement when `watch_moves` is set.
    pub async fn interrupted(&mut self, watch_moves: bool) -> Interrupt {
        let since = self.moves;
        let result = self
            .receiver
            .wait_for(|presence| !presence.online || (watch_moves && presence.moves != since))
            .await;
        match result {
            Ok(presence) if presence.online => Interrupt::Moved,
            _ => Interrupt::Disconnected,
        }
    }
}

//! Pipeline states and the terminal abort record.

use scroll_core::{BindingKey, ItemId, PlayerId, SafeLocation, TeleportError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Validating,
    ResolvingDestination,
    WarmingUp,
    CheckingGates,
    Executing,
    Completed,
}

/// A request ended before relocation committed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("teleport aborted during {stage}: {reason}")]
pub struct Aborted {
    pub stage: Stage,
    pub reason: TeleportError,
}

impl Aborted {
    pub fn new(stage: Stage, reason: TeleportError) -> Self {
        Self { stage, reason }
    }
}

/// A "use scroll" action reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeleportRequest {
    pub player: PlayerId,
    pub item: ItemId,
}

impl TeleportRequest {
    pub fn new(player: PlayerId, item: ItemId) -> Self {
        Self { player, item }
    }
}

/// Outcome of a completed teleport.
#[derive(Clone, Debug, PartialEq)]
pub struct TeleportReceipt {
    pub request: u64,
    pub key: BindingKey,
    pub destination: SafeLocation,
    pub charges_left: u32,
    /// The scroll was removed from the inventory after its last charge.
    pub item_removed: bool,
}

//! Event payloads published on the bus.

use scroll_core::{BindingKey, Destination, ItemId, PlayerId, SafeLocation, TeleportError};

use crate::pipeline::Stage;

#[derive(Debug, Clone)]
pub enum TeleportEvent {
    /// The destination resolved and the warmup delay started.
    WarmingUp {
        request: u64,
        player: PlayerId,
        item: ItemId,
        seconds: u64,
    },
    Completed {
        request: u64,
        player: PlayerId,
        item: ItemId,
        key: BindingKey,
        destination: SafeLocation,
        /// Charges left on the scroll after this use.
        charges_left: u32,
    },
    Aborted {
        request: u64,
        player: PlayerId,
        item: ItemId,
        stage: Stage,
        reason: TeleportError,
    },
}

#[derive(Debug, Clone)]
pub enum RegistryEvent {
    Bound {
        key: BindingKey,
        destination: Destination,
    },
    Unbound {
        key: BindingKey,
    },
}

//! Topic-based event bus for runtime events.
//!
//! Hosts subscribe to the topics they care about, for instance to play a
//! sound on arrival or to audit binding changes.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{RegistryEvent, TeleportEvent};

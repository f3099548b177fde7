//! Teleport rules and data types shared across the scroll engine.
//!
//! `scroll-core` owns the pure parts of scroll teleportation: item charge
//! state, coordinates, the landing scan, configuration, and the abort
//! taxonomy. Nothing here touches I/O or locks; the runtime crate layers
//! concurrency and host collaborators on top.
pub mod block;
pub mod config;
pub mod destination;
pub mod error;
pub mod ids;
pub mod item;
pub mod location;
pub mod safety;

pub use block::{Block, HeightRange};
pub use config::{ConfigError, ScrollConfig, ScrollTemplate};
pub use destination::{Destination, DestinationParseError, parse_destination, parse_location};
pub use error::TeleportError;
pub use ids::{BindingKey, BindingKeyError, ItemId, PlayerId, WorldId};
pub use item::{ItemError, ItemTag, ScrollItem};
pub use location::{
    BlockPos, CHUNK_SIZE, ChunkPos, CoordinateError, Orientation, SafeLocation, SavedLocation, Vec3,
};
pub use safety::{BlockView, Footprint, Landing, LandingScan, Offsets, VerticalPreference};

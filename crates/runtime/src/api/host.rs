//! Capability interfaces the runtime consumes from the host game server.
//!
//! The engine never touches entities, terrain, or item stacks directly. Hosts
//! implement these traits over their own world model; the in-memory versions
//! in [`crate::host`] back tests and the reference server.
use std::sync::Arc;

use async_trait::async_trait;
use scroll_core::{
    Block, BlockPos, ChunkPos, HeightRange, ItemId, ItemTag, PlayerId, SafeLocation, SavedLocation,
    ScrollConfig, WorldId,
};

use super::errors::HostError;

/// Capability strings checked through [`PermissionGate`].
pub mod capability {
    pub const USE: &str = "scroll.use";
    pub const BIND: &str = "scroll.bind";
    pub const ADMIN: &str = "scroll.admin";
}

/// Read access to terrain plus on-demand chunk loading.
#[async_trait]
pub trait WorldQuery: Send + Sync {
    fn world_exists(&self, world: &WorldId) -> bool;

    /// Every world a random destination may pick from.
    fn worlds(&self) -> Vec<WorldId>;

    /// Build limits of `world`, `None` when the world is unknown.
    fn height_range(&self, world: &WorldId) -> Option<HeightRange>;

    fn is_chunk_loaded(&self, world: &WorldId, chunk: ChunkPos) -> bool;

    /// Load `chunk`, resolving once its blocks can be read.
    async fn load_chunk(&self, world: &WorldId, chunk: ChunkPos) -> Result<(), HostError>;

    /// `None` when the chunk holding `pos` is not loaded.
    fn block(&self, world: &WorldId, pos: BlockPos) -> Option<Block>;
}

/// World mutation: moving a player's entity.
#[async_trait]
pub trait EntityMover: Send + Sync {
    async fn relocate(&self, player: PlayerId, to: &SafeLocation) -> Result<(), HostError>;

    /// Where the player currently stands.
    fn location_of(&self, player: PlayerId) -> Option<SavedLocation>;
}

pub trait PermissionGate: Send + Sync {
    fn has_capability(&self, player: PlayerId, capability: &str) -> bool;
}

/// Economy hook. Only consulted when the configured cost is non-zero.
#[async_trait]
pub trait CostGate: Send + Sync {
    /// Deduct `amount`; `Ok(false)` when the player cannot afford it.
    async fn try_charge(&self, player: PlayerId, amount: u64) -> Result<bool, HostError>;

    async fn refund(&self, player: PlayerId, amount: u64) -> Result<(), HostError>;
}

/// Item instances and the opaque tag stored on each.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Current tag of `item`, `None` once the item no longer exists.
    async fn load(&self, item: ItemId) -> Result<Option<ItemTag>, HostError>;

    async fn store(&self, item: ItemId, tag: &ItemTag) -> Result<(), HostError>;

    async fn remove(&self, item: ItemId) -> Result<(), HostError>;

    /// Create a new scroll in `owner`'s inventory.
    async fn issue(&self, owner: PlayerId, tag: &ItemTag) -> Result<ItemId, HostError>;

    /// The scroll the player is holding, if any.
    async fn held_scroll(&self, player: PlayerId) -> Result<Option<ItemId>, HostError>;
}

/// Where `reload` reads a fresh [`ScrollConfig`] from.
pub trait ConfigSource: Send + Sync {
    fn reload(&self) -> Result<ScrollConfig, HostError>;
}

/// The set of host collaborators a runtime is wired to.
#[derive(Clone)]
pub struct Host {
    pub world: Arc<dyn WorldQuery>,
    pub mover: Arc<dyn EntityMover>,
    pub permissions: Arc<dyn PermissionGate>,
    pub inventory: Arc<dyn Inventory>,
    pub economy: Option<Arc<dyn CostGate>>,
}

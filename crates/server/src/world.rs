//! In-process host the reference server runs against.
use std::sync::Arc;

use scroll_core::{HeightRange, PlayerId, SavedLocation, WorldId};
use scroll_runtime::host::{
    MemoryEconomy, MemoryInventory, MemoryMover, MemoryWorld, StaticPermissions,
};
use scroll_runtime::{EntityMover, ScrollRuntimeBuilder, capability};

/// Operator account; every other player only gets `scroll.use`.
pub const OPERATOR: PlayerId = PlayerId(1);

pub const STARTING_BALANCE: u64 = 100;

const OVERWORLD_GROUND: i32 = 64;
const NETHER_GROUND: i32 = 32;

pub fn overworld() -> WorldId {
    WorldId::new("overworld")
}

pub fn nether() -> WorldId {
    WorldId::new("nether")
}

pub fn spawn_point() -> SavedLocation {
    SavedLocation::at_block(overworld(), 0, OVERWORLD_GROUND, 0)
}

#[derive(Clone)]
pub struct ReferenceHost {
    pub world: Arc<MemoryWorld>,
    pub mover: Arc<MemoryMover>,
    pub permissions: Arc<StaticPermissions>,
    pub inventory: Arc<MemoryInventory>,
    pub economy: Arc<MemoryEconomy>,
}

impl ReferenceHost {
    pub fn new() -> Self {
        let world = Arc::new(MemoryWorld::new());
        world.add_flat(overworld(), HeightRange::new(-64, 320), OVERWORLD_GROUND);
        world.add_flat(nether(), HeightRange::new(0, 256), NETHER_GROUND);

        let permissions = Arc::new(StaticPermissions::new());
        for capability in [capability::USE, capability::BIND, capability::ADMIN] {
            permissions.grant(OPERATOR, capability);
        }

        Self {
            world,
            mover: Arc::new(MemoryMover::new()),
            permissions,
            inventory: Arc::new(MemoryInventory::new()),
            economy: Arc::new(MemoryEconomy::new()),
        }
    }

    /// Wire every collaborator into `builder`.
    pub fn install(&self, builder: ScrollRuntimeBuilder) -> ScrollRuntimeBuilder {
        builder
            .world(self.world.clone())
            .mover(self.mover.clone())
            .permissions(self.permissions.clone())
            .inventory(self.inventory.clone())
            .economy(self.economy.clone())
    }

    /// Put a newly joined player at spawn with the default grants.
    pub fn admit(&self, player: PlayerId) {
        if self.mover.location_of(player).is_none() {
            self.mover.place(player, spawn_point());
            self.economy.deposit(player, STARTING_BALANCE);
        }
        self.permissions.grant(player, capability::USE);
    }
}

impl Default for ReferenceHost {
    fn default() -> Self {
        Self::new()
    }
}

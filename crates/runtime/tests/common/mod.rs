//! Shared fixture: a flat overworld, three online players, and a `home`
//! binding at (10, 64, 10).
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use scroll_core::{
    BindingKey, HeightRange, ItemId, ItemTag, PlayerId, SavedLocation, ScrollConfig, WorldId,
};
use scroll_runtime::host::{
    MemoryEconomy, MemoryInventory, MemoryMover, MemoryWorld, StaticPermissions,
};
use scroll_runtime::{
    Aborted, ConfigSource, HostError, InMemoryLocationRepo, LocationRepository, ManualClock,
    ScrollRuntime, TeleportReceipt, TeleportRequest, Timestamp, capability,
};

pub const ADMIN: PlayerId = PlayerId(1);
pub const ALEX: PlayerId = PlayerId(2);
pub const SAM: PlayerId = PlayerId(3);

pub fn overworld() -> WorldId {
    WorldId::new("overworld")
}

pub fn key(raw: &str) -> BindingKey {
    BindingKey::parse(raw).expect("valid key")
}

pub fn home() -> SavedLocation {
    SavedLocation::at_block(overworld(), 10, 64, 10)
}

pub fn spawn() -> SavedLocation {
    SavedLocation::at_block(overworld(), 0, 64, 0)
}

/// A config source tests stage the next reload in.
#[derive(Default)]
pub struct StagedConfig {
    next: Mutex<Option<ScrollConfig>>,
}

impl StagedConfig {
    pub fn stage(&self, config: ScrollConfig) {
        *self.next.lock().unwrap() = Some(config);
    }
}

impl ConfigSource for StagedConfig {
    fn reload(&self) -> Result<ScrollConfig, HostError> {
        self.next
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| HostError::Unavailable("nothing staged".into()))
    }
}

pub struct Fixture {
    pub runtime: ScrollRuntime,
    pub world: Arc<MemoryWorld>,
    pub mover: Arc<MemoryMover>,
    pub inventory: Arc<MemoryInventory>,
    pub permissions: Arc<StaticPermissions>,
    pub economy: Arc<MemoryEconomy>,
    pub clock: Arc<ManualClock>,
    pub repository: Arc<InMemoryLocationRepo>,
    pub source: Arc<StagedConfig>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(ScrollConfig::default())
    }

    pub fn with_config(config: ScrollConfig) -> Self {
        Self::build(config, Arc::new(InMemoryLocationRepo::new()))
    }

    fn build(config: ScrollConfig, repository: Arc<InMemoryLocationRepo>) -> Self {
        let world = Arc::new(MemoryWorld::new());
        world.add_flat(overworld(), HeightRange::new(-64, 320), 64);

        let permissions = Arc::new(StaticPermissions::new());
        for capability in [capability::USE, capability::BIND, capability::ADMIN] {
            permissions.grant(ADMIN, capability);
        }
        permissions.grant(ALEX, capability::USE);
        permissions.grant(SAM, capability::USE);

        let mover = Arc::new(MemoryMover::new());
        let inventory = Arc::new(MemoryInventory::new());
        let economy = Arc::new(MemoryEconomy::new());
        let clock = Arc::new(ManualClock::new(Timestamp(0)));
        let source = Arc::new(StagedConfig::default());

        let runtime = ScrollRuntime::builder()
            .config(config)
            .world(world.clone())
            .mover(mover.clone())
            .permissions(permissions.clone())
            .inventory(inventory.clone())
            .economy(economy.clone())
            .repository(repository.clone() as Arc<dyn LocationRepository>)
            .clock(clock.clone())
            .config_source(source.clone())
            .rng_seed(7)
            .build()
            .expect("runtime should build");

        for player in [ADMIN, ALEX, SAM] {
            runtime.sessions().join(player);
            mover.place(player, spawn());
        }
        runtime
            .registry()
            .bind(key("home"), home())
            .expect("bind home");

        Self {
            runtime,
            world,
            mover,
            inventory,
            permissions,
            economy,
            clock,
            repository,
            source,
        }
    }

    /// A scroll bound to `home` in `owner`'s hand.
    pub fn scroll(&self, owner: PlayerId, charges: u32) -> ItemId {
        self.inventory.insert(
            owner,
            ItemTag {
                bound_key: Some("home".into()),
                charges,
                ..ItemTag::default()
            },
        )
    }

    pub fn charges(&self, item: ItemId) -> Option<u32> {
        self.inventory.tag(item).map(|tag| tag.charges)
    }

    pub async fn use_scroll(
        &self,
        player: PlayerId,
        item: ItemId,
    ) -> Result<TeleportReceipt, Aborted> {
        self.runtime
            .submit(TeleportRequest::new(player, item))
            .await
    }
}

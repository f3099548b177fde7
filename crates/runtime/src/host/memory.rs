use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use scroll_core::{
    Block, BlockPos, ChunkPos, HeightRange, ItemId, ItemTag, PlayerId, SafeLocation,
    SavedLocation, WorldId,
};

use crate::api::{CostGate, EntityMover, HostError, Inventory, PermissionGate, WorldQuery};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Terrain {
    range: HeightRange,
    /// Blocks below this height are solid, the rest air.
    ground: i32,
    overrides: HashMap<BlockPos, Block>,
    unloaded: HashSet<ChunkPos>,
}

impl Terrain {
    fn block(&self, pos: BlockPos) -> Option<Block> {
        if self.unloaded.contains(&pos.chunk()) {
            return None;
        }
        if !self.range.contains(pos.y) {
            return Some(Block::Void);
        }
        Some(match self.overrides.get(&pos) {
            Some(block) => *block,
            None if pos.y < self.ground => Block::Solid,
            None => Block::Air,
        })
    }
}

/// Flat worlds with per-block overrides and controllable chunk loading.
#[derive(Default)]
pub struct MemoryWorld {
    worlds: Mutex<HashMap<WorldId, Terrain>>,
    load_delay_millis: AtomicU64,
    fail_loads: AtomicBool,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fully loaded flat world whose surface is at `ground`.
    pub fn add_flat(&self, world: WorldId, range: HeightRange, ground: i32) {
        lock(&self.worlds).insert(
            world,
            Terrain {
                range,
                ground,
                overrides: HashMap::new(),
                unloaded: HashSet::new(),
            },
        );
    }

    pub fn set_block(&self, world: &WorldId, pos: BlockPos, block: Block) {
        if let Some(terrain) = lock(&self.worlds).get_mut(world) {
            terrain.overrides.insert(pos, block);
        }
    }

    pub fn unload_chunk(&self, world: &WorldId, chunk: ChunkPos) {
        if let Some(terrain) = lock(&self.worlds).get_mut(world) {
            terrain.unloaded.insert(chunk);
        }
    }

    /// Time each `load_chunk` takes before the chunk becomes readable.
    pub fn set_load_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.load_delay_millis.store(millis, Ordering::SeqCst);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl WorldQuery for MemoryWorld {
    fn world_exists(&self, world: &WorldId) -> bool {
        lock(&self.worlds).contains_key(world)
    }

    fn worlds(&self) -> Vec<WorldId> {
        let mut worlds: Vec<_> = lock(&self.worlds).keys().cloned().collect();
        worlds.sort_unstable();
        worlds
    }

    fn height_range(&self, world: &WorldId) -> Option<HeightRange> {
        lock(&self.worlds).get(world).map(|terrain| terrain.range)
    }

    fn is_chunk_loaded(&self, world: &WorldId, chunk: ChunkPos) -> bool {
        lock(&self.worlds)
            .get(world)
            .is_some_and(|terrain| !terrain.unloaded.contains(&chunk))
    }

    async fn load_chunk(&self, world: &WorldId, chunk: ChunkPos) -> Result<(), HostError> {
        let delay = self.load_delay_millis.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(HostError::Unavailable(format!("chunk {} failed to load", chunk)));
        }
        let mut worlds = lock(&self.worlds);
        let terrain = worlds
            .get_mut(world)
            .ok_or_else(|| HostError::UnknownWorld(world.to_string()))?;
        terrain.unloaded.remove(&chunk);
        Ok(())
    }

    fn block(&self, world: &WorldId, pos: BlockPos) -> Option<Block> {
        lock(&self.worlds)
            .get(world)
            .and_then(|terrain| terrain.block(pos))
    }
}

/// Player positions, with a log of every accepted relocation.
#[derive(Default)]
pub struct MemoryMover {
    positions: Mutex<HashMap<PlayerId, SavedLocation>>,
    relocations: Mutex<Vec<(PlayerId, SafeLocation)>>,
    reject: AtomicBool,
    relocate_delay_millis: AtomicU64,
}

impl MemoryMover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&self, player: PlayerId, location: SavedLocation) {
        lock(&self.positions).insert(player, location);
    }

    /// Make every following relocation fail.
    pub fn reject_relocations(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    /// Time each relocation takes before it lands.
    pub fn set_relocate_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.relocate_delay_millis.store(millis, Ordering::SeqCst);
    }

    pub fn relocations(&self) -> Vec<(PlayerId, SafeLocation)> {
        lock(&self.relocations).clone()
    }
}

#[async_trait]
impl EntityMover for MemoryMover {
    async fn relocate(&self, player: PlayerId, to: &SafeLocation) -> Result<(), HostError> {
        let delay = self.relocate_delay_millis.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.reject.load(Ordering::SeqCst) {
            return Err(HostError::Rejected(format!("{} cannot be moved", player)));
        }
        lock(&self.positions).insert(
            player,
            SavedLocation::new(to.world.clone(), to.position, to.orientation),
        );
        lock(&self.relocations).push((player, to.clone()));
        Ok(())
    }

    fn location_of(&self, player: PlayerId) -> Option<SavedLocation> {
        lock(&self.positions).get(&player).cloned()
    }
}

/// Capability grants fixed at setup time, or everything allowed.
#[derive(Default)]
pub struct StaticPermissions {
    grants: Mutex<HashMap<PlayerId, HashSet<String>>>,
    allow_all: AtomicBool,
}

impl StaticPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_all() -> Self {
        let permissions = Self::default();
        permissions.allow_all.store(true, Ordering::SeqCst);
        permissions
    }

    pub fn grant(&self, player: PlayerId, capability: &str) {
        lock(&self.grants)
            .entry(player)
            .or_default()
            .insert(capability.to_owned());
    }

    pub fn revoke(&self, player: PlayerId, capability: &str) {
        self.allow_all.store(false, Ordering::SeqCst);
        if let Some(granted) = lock(&self.grants).get_mut(&player) {
            granted.remove(capability);
        }
    }
}

impl PermissionGate for StaticPermissions {
    fn has_capability(&self, player: PlayerId, capability: &str) -> bool {
        self.allow_all.load(Ordering::SeqCst)
            || lock(&self.grants)
                .get(&player)
                .is_some_and(|granted| granted.contains(capability))
    }
}

struct StoredItem {
    owner: PlayerId,
    tag: ItemTag,
}

/// Item tags keyed by id, plus which item each player holds.
pub struct MemoryInventory {
    items: Mutex<HashMap<ItemId, StoredItem>>,
    held: Mutex<HashMap<PlayerId, ItemId>>,
    next_id: AtomicU64,
    fail_writes: AtomicBool,
}

impl MemoryInventory {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            held: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Put a scroll straight into `owner`'s hand.
    pub fn insert(&self, owner: PlayerId, tag: ItemTag) -> ItemId {
        let id = ItemId(self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.items).insert(id, StoredItem { owner, tag });
        lock(&self.held).insert(owner, id);
        id
    }

    pub fn tag(&self, item: ItemId) -> Option<ItemTag> {
        lock(&self.items).get(&item).map(|stored| stored.tag.clone())
    }

    pub fn owner(&self, item: ItemId) -> Option<PlayerId> {
        lock(&self.items).get(&item).map(|stored| stored.owner)
    }

    pub fn hold(&self, player: PlayerId, item: ItemId) {
        lock(&self.held).insert(player, item);
    }

    /// Make `store` and `remove` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), HostError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(HostError::Unavailable("inventory is read-only".into()));
        }
        Ok(())
    }
}

impl Default for MemoryInventory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn load(&self, item: ItemId) -> Result<Option<ItemTag>, HostError> {
        Ok(self.tag(item))
    }

    async fn store(&self, item: ItemId, tag: &ItemTag) -> Result<(), HostError> {
        self.check_writable()?;
        match lock(&self.items).get_mut(&item) {
            Some(stored) => {
                stored.tag = tag.clone();
                Ok(())
            }
            None => Err(HostError::Rejected(format!("{} no longer exists", item))),
        }
    }

    async fn remove(&self, item: ItemId) -> Result<(), HostError> {
        self.check_writable()?;
        if let Some(stored) = lock(&self.items).remove(&item) {
            let mut held = lock(&self.held);
            if held.get(&stored.owner) == Some(&item) {
                held.remove(&stored.owner);
            }
        }
        Ok(())
    }

    async fn issue(&self, owner: PlayerId, tag: &ItemTag) -> Result<ItemId, HostError> {
        self.check_writable()?;
        Ok(self.insert(owner, tag.clone()))
    }

    async fn held_scroll(&self, player: PlayerId) -> Result<Option<ItemId>, HostError> {
        Ok(lock(&self.held).get(&player).copied())
    }
}

/// Balances in whole currency units.
#[derive(Default)]
pub struct MemoryEconomy {
    balances: Mutex<HashMap<PlayerId, u64>>,
}

impl MemoryEconomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&self, player: PlayerId, amount: u64) {
        *lock(&self.balances).entry(player).or_default() += amount;
    }

    pub fn balance(&self, player: PlayerId) -> u64 {
        lock(&self.balances).get(&player).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CostGate for MemoryEconomy {
    async fn try_charge(&self, player: PlayerId, amount: u64) -> Result<bool, HostError> {
        let mut balances = lock(&self.balances);
        let balance = balances.entry(player).or_default();
        if *balance < amount {
            return Ok(false);
        }
        *balance -= amount;
        Ok(true)
    }

    async fn refund(&self, player: PlayerId, amount: u64) -> Result<(), HostError> {
        self.deposit(player, amount);
        Ok(())
    }
}

//! Turns a bound destination into a verified landing spot.
//!
//! Chunks under the entity footprint are loaded first, bounded by the
//! configured timeout, and only then is the terrain scanned. The scan never
//! guesses at unloaded blocks. Random destinations pick a column, land on its
//! surface, and retry a few times before giving up.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use scroll_core::{
    BindingKey, Block, BlockPos, BlockView, CoordinateError, Destination, HeightRange, Landing,
    LandingScan, Orientation, SafeLocation, SavedLocation, ScrollConfig, TeleportError, WorldId,
};

use crate::api::{HostError, WorldQuery};

/// Half-width of the square a plain `random` destination picks from.
pub const RANDOM_SPREAD: u32 = 10_000;

/// Columns tried per random destination before it counts as unsafe.
pub const RANDOM_ATTEMPTS: usize = 8;

pub struct SafeDestinationResolver {
    world: Arc<dyn WorldQuery>,
    rng: Mutex<SmallRng>,
}

/// Scan parameters taken from one config snapshot.
struct Search {
    scan: LandingScan,
    timeout: Duration,
}

impl SafeDestinationResolver {
    pub fn new(world: Arc<dyn WorldQuery>) -> Self {
        Self::with_rng(world, SmallRng::from_entropy())
    }

    /// Resolver whose random destinations repeat for the same seed.
    pub fn seeded(world: Arc<dyn WorldQuery>, seed: u64) -> Self {
        Self::with_rng(world, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(world: Arc<dyn WorldQuery>, rng: SmallRng) -> Self {
        Self {
            world,
            rng: Mutex::new(rng),
        }
    }

    /// Landing spot for the destination bound to `key`.
    ///
    /// A destination in a world the host does not know is reported as
    /// [`TeleportError::DestinationUnavailable`] carrying `key`.
    pub async fn resolve(
        &self,
        key: &BindingKey,
        destination: &Destination,
        config: &ScrollConfig,
    ) -> Result<SafeLocation, TeleportError> {
        let search = Search {
            scan: config.landing_scan(),
            timeout: config.chunk_load_timeout(),
        };
        match destination {
            Destination::Fixed(location) => self.resolve_fixed(key, location, &search).await,
            Destination::Random { world } => {
                let world = match world {
                    Some(world) => world.clone(),
                    None => self.pick_world(key)?,
                };
                self.resolve_random(
                    key,
                    &world,
                    (0, 0),
                    RANDOM_SPREAD,
                    Orientation::default(),
                    &search,
                )
                .await
            }
            Destination::RandomRadius { center, radius } => {
                let anchor = center.block().map_err(|error| off_grid(center, error))?;
                self.resolve_random(
                    key,
                    &center.world,
                    (anchor.x, anchor.z),
                    *radius,
                    center.orientation,
                    &search,
                )
                .await
            }
        }
    }

    async fn resolve_fixed(
        &self,
        key: &BindingKey,
        location: &SavedLocation,
        search: &Search,
    ) -> Result<SafeLocation, TeleportError> {
        let world = &location.world;
        let range = self.range(key, world)?;
        let raw = location.block().map_err(|error| off_grid(location, error))?;
        self.load_footprint(world, raw, search).await?;

        let view = WorldView {
            world: self.world.as_ref(),
            id: world,
            range,
        };
        match search.scan.find(&view, raw) {
            Landing::Safe(feet) => {
                if feet != raw {
                    tracing::debug!("Adjusted landing from {} to {}", raw, feet);
                }
                Ok(SafeLocation::new(world.clone(), feet, location.orientation))
            }
            Landing::Unsafe => {
                tracing::debug!("No safe landing within {} blocks of {}", search.scan.radius, raw);
                Err(TeleportError::UnsafeDestination)
            }
            Landing::Unloaded(chunk) => {
                tracing::warn!("Chunk {} unloaded again before the scan finished", chunk);
                Err(TeleportError::UnsafeDestination)
            }
        }
    }

    async fn resolve_random(
        &self,
        key: &BindingKey,
        world: &WorldId,
        (center_x, center_z): (i32, i32),
        spread: u32,
        orientation: Orientation,
        search: &Search,
    ) -> Result<SafeLocation, TeleportError> {
        let range = self.range(key, world)?;
        let view = WorldView {
            world: self.world.as_ref(),
            id: world,
            range,
        };

        for attempt in 1..=RANDOM_ATTEMPTS {
            let Some((x, z)) = self.pick_column(center_x, center_z, spread) else {
                continue;
            };
            let anchor = BlockPos::new(x, range.min_y, z);
            self.load_footprint(world, anchor, search).await?;

            match search.scan.surface(&view, x, z) {
                Landing::Safe(feet) => {
                    tracing::debug!(attempt, "Random landing at {} in {}", feet, world);
                    return Ok(SafeLocation::new(world.clone(), feet, orientation));
                }
                Landing::Unsafe => tracing::debug!(attempt, "Column {}, {} has no safe surface", x, z),
                Landing::Unloaded(chunk) => {
                    tracing::warn!(attempt, "Chunk {} unloaded again before the scan finished", chunk);
                }
            }
        }
        Err(TeleportError::UnsafeDestination)
    }

    fn range(&self, key: &BindingKey, world: &WorldId) -> Result<HeightRange, TeleportError> {
        self.world
            .height_range(world)
            .filter(|_| self.world.world_exists(world))
            .ok_or_else(|| {
                tracing::debug!(key = %key, "World {} is not loaded", world);
                TeleportError::DestinationUnavailable(key.to_string())
            })
    }

    fn pick_world(&self, key: &BindingKey) -> Result<WorldId, TeleportError> {
        let mut worlds = self.world.worlds();
        if worlds.is_empty() {
            return Err(TeleportError::DestinationUnavailable(key.to_string()));
        }
        let index = self.rng().gen_range(0..worlds.len());
        Ok(worlds.swap_remove(index))
    }

    /// A column within `spread` of the center, `None` when it falls off the grid.
    fn pick_column(&self, center_x: i32, center_z: i32, spread: u32) -> Option<(i32, i32)> {
        let spread = i64::from(spread);
        let (dx, dz) = {
            let mut rng = self.rng();
            (rng.gen_range(-spread..=spread), rng.gen_range(-spread..=spread))
        };
        let x = i32::try_from(i64::from(center_x) + dx).ok()?;
        let z = i32::try_from(i64::from(center_z) + dz).ok()?;
        Some((x, z))
    }

    // The generator has no invariant a panic could break.
    fn rng(&self) -> MutexGuard<'_, SmallRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn load_footprint(
        &self,
        world: &WorldId,
        raw: BlockPos,
        search: &Search,
    ) -> Result<(), TeleportError> {
        let missing: Vec<_> = search
            .scan
            .footprint
            .chunks(raw)
            .into_iter()
            .filter(|chunk| !self.world.is_chunk_loaded(world, *chunk))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }

        tracing::debug!("Loading {} chunk(s) around {}", missing.len(), raw);
        let load = async {
            for chunk in missing {
                self.world.load_chunk(world, chunk).await?;
            }
            Ok::<(), HostError>(())
        };

        match tokio::time::timeout(search.timeout, load).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => {
                tracing::warn!("Chunk load failed in {}: {}", world, error);
                Err(TeleportError::UnsafeDestination)
            }
            Err(_) => {
                tracing::warn!(
                    "Chunk load in {} exceeded {}ms",
                    world,
                    search.timeout.as_millis()
                );
                Err(TeleportError::Timeout)
            }
        }
    }
}

fn off_grid(location: &SavedLocation, error: CoordinateError) -> TeleportError {
    tracing::warn!("Bound location {} is off the block grid: {}", location.describe(), error);
    TeleportError::UnsafeDestination
}

/// Adapts the host's world to the scan's terrain view.
struct WorldView<'a> {
    world: &'a dyn WorldQuery,
    id: &'a WorldId,
    range: HeightRange,
}

impl BlockView for WorldView<'_> {
    fn block(&self, pos: BlockPos) -> Option<Block> {
        self.world.block(self.id, pos)
    }

    fn height_range(&self) -> HeightRange {
        self.range
    }
}

#[cfg(test)]
mod tests {
    use scroll_core::{ChunkPos, Vec3};

    use super::*;
    use crate::host::MemoryWorld;

    fn overworld() -> WorldId {
        WorldId::new("overworld")
    }

    fn home() -> BindingKey {
        BindingKey::parse("home").unwrap()
    }

    fn setup() -> (Arc<MemoryWorld>, SafeDestinationResolver) {
        let world = Arc::new(MemoryWorld::new());
        world.add_flat(overworld(), HeightRange::new(0, 256), 64);
        let resolver = SafeDestinationResolver::seeded(world.clone(), 7);
        (world, resolver)
    }

    async fn resolve(
        resolver: &SafeDestinationResolver,
        destination: impl Into<Destination>,
    ) -> Result<SafeLocation, TeleportError> {
        resolver
            .resolve(&home(), &destination.into(), &ScrollConfig::default())
            .await
    }

    #[tokio::test]
    async fn lands_on_surface_from_buried_target() {
        let (_, resolver) = setup();
        let target = SavedLocation::at_block(overworld(), 10, 60, 10);
        let safe = resolve(&resolver, target).await.unwrap();
        assert_eq!(safe.feet, BlockPos::new(10, 64, 10));
        assert_eq!(safe.position.x, 10.5);
    }

    #[tokio::test]
    async fn unknown_world_reports_the_binding_key() {
        let (_, resolver) = setup();
        let target = SavedLocation::at_block(WorldId::new("the_end"), 0, 64, 0);
        assert_eq!(
            resolve(&resolver, target).await,
            Err(TeleportError::DestinationUnavailable("home".into()))
        );
        assert_eq!(
            resolve(
                &resolver,
                Destination::Random {
                    world: Some(WorldId::new("the_end"))
                }
            )
            .await,
            Err(TeleportError::DestinationUnavailable("home".into()))
        );
    }

    #[tokio::test]
    async fn loads_unloaded_chunk_before_scanning() {
        let (world, resolver) = setup();
        world.unload_chunk(&overworld(), ChunkPos::new(2, 2));
        let target = SavedLocation::at_block(overworld(), 40, 64, 40);

        let safe = resolve(&resolver, target).await.unwrap();
        assert_eq!(safe.feet, BlockPos::new(40, 64, 40));
        assert!(world.is_chunk_loaded(&overworld(), ChunkPos::new(2, 2)));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_chunk_load_times_out() {
        let (world, resolver) = setup();
        world.unload_chunk(&overworld(), ChunkPos::new(0, 0));
        world.set_load_delay(Duration::from_secs(10));
        let target = SavedLocation::at_block(overworld(), 1, 64, 1);

        assert_eq!(resolve(&resolver, target).await, Err(TeleportError::Timeout));
        assert!(!world.is_chunk_loaded(&overworld(), ChunkPos::new(0, 0)));
    }

    #[tokio::test]
    async fn failed_chunk_load_is_unsafe() {
        let (world, resolver) = setup();
        world.unload_chunk(&overworld(), ChunkPos::new(0, 0));
        world.fail_loads(true);
        let target = SavedLocation::at_block(overworld(), 1, 64, 1);

        assert_eq!(
            resolve(&resolver, target).await,
            Err(TeleportError::UnsafeDestination)
        );
    }

    #[tokio::test]
    async fn obstructed_window_is_unsafe() {
        let (world, resolver) = setup();
        for y in 56..=73 {
            world.set_block(&overworld(), BlockPos::new(5, y, 5), Block::Solid);
        }
        let target = SavedLocation::at_block(overworld(), 5, 64, 5);
        assert_eq!(
            resolve(&resolver, target).await,
            Err(TeleportError::UnsafeDestination)
        );
    }

    #[tokio::test]
    async fn extreme_heights_are_unsafe_not_fatal() {
        let (_, resolver) = setup();
        for y in [f64::from(i32::MAX), f64::from(i32::MIN)] {
            let target =
                SavedLocation::new(overworld(), Vec3::new(0.0, y, 0.0), Orientation::default());
            assert_eq!(
                resolve(&resolver, target).await,
                Err(TeleportError::UnsafeDestination)
            );
        }
        let off_grid =
            SavedLocation::new(overworld(), Vec3::new(0.0, 3.0e9, 0.0), Orientation::default());
        assert_eq!(
            resolve(&resolver, off_grid).await,
            Err(TeleportError::UnsafeDestination)
        );
    }

    #[tokio::test]
    async fn random_radius_lands_on_the_surface_near_the_center() {
        let (_, resolver) = setup();
        let center = SavedLocation::at_block(overworld(), 500, 90, -500);
        for _ in 0..20 {
            let safe = resolve(
                &resolver,
                Destination::RandomRadius {
                    center: center.clone(),
                    radius: 32,
                },
            )
            .await
            .unwrap();
            assert_eq!(safe.world, overworld());
            assert_eq!(safe.feet.y, 64);
            assert!((468..=532).contains(&safe.feet.x), "{}", safe.feet);
            assert!((-532..=-468).contains(&safe.feet.z), "{}", safe.feet);
        }
    }

    #[tokio::test]
    async fn random_without_world_picks_a_loaded_one() {
        let (world, resolver) = setup();
        world.add_flat(WorldId::new("nether"), HeightRange::new(0, 128), 32);

        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..32 {
            let safe = resolve(&resolver, Destination::Random { world: None }).await.unwrap();
            let expected_y = if safe.world == overworld() { 64 } else { 32 };
            assert_eq!(safe.feet.y, expected_y);
            assert!(safe.feet.x.unsigned_abs() <= RANDOM_SPREAD);
            seen.insert(safe.world);
        }
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn random_gives_up_on_a_world_without_floor() {
        let (world, resolver) = setup();
        world.add_flat(WorldId::new("void"), HeightRange::new(0, 128), 0);
        assert_eq!(
            resolve(
                &resolver,
                Destination::Random {
                    world: Some(WorldId::new("void"))
                }
            )
            .await,
            Err(TeleportError::UnsafeDestination)
        );
    }

    #[tokio::test]
    async fn random_radius_at_the_grid_edge_does_not_overflow() {
        let (_, resolver) = setup();
        let center = SavedLocation::at_block(overworld(), i32::MAX, 64, i32::MIN);
        let result = resolve(
            &resolver,
            Destination::RandomRadius {
                center,
                radius: 16,
            },
        )
        .await;
        match result {
            Ok(safe) => assert_eq!(safe.feet.y, 64),
            Err(reason) => assert_eq!(reason, TeleportError::UnsafeDestination),
        }
    }
}

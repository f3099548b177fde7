//! Runtime assembly.
//!
//! [`ScrollRuntime`] owns the services a host needs: the location registry,
//! cooldowns, sessions, the event bus, and the teleport pipeline. It is cheap
//! to clone, and clones share all state, including the live config that
//! [`ScrollRuntime::reload`] swaps.

use std::sync::Arc;

use scroll_core::ScrollConfig;

use crate::api::{
    Collaborator, ConfigSource, CostGate, EntityMover, Host, Inventory, PermissionGate, Result,
    RuntimeError, WorldQuery,
};
use crate::cooldown::CooldownTracker;
use crate::events::EventBus;
use crate::pipeline::{Aborted, TeleportPipeline, TeleportReceipt, TeleportRequest};
use crate::registry::LocationRegistry;
use crate::repository::{InMemoryLocationRepo, LocationRepository};
use crate::resolver::SafeDestinationResolver;
use crate::session::SessionTracker;
use crate::utils::{Clock, Shared, SystemClock};

#[derive(Clone)]
pub struct ScrollRuntime {
    config: Arc<Shared<ScrollConfig>>,
    config_source: Option<Arc<dyn ConfigSource>>,
    host: Host,
    registry: Arc<LocationRegistry>,
    cooldowns: Arc<CooldownTracker>,
    sessions: Arc<SessionTracker>,
    events: EventBus,
    pipeline: Arc<TeleportPipeline>,
}

impl ScrollRuntime {
    pub fn builder() -> ScrollRuntimeBuilder {
        ScrollRuntimeBuilder::new()
    }

    /// Submit a "use scroll" action to the pipeline.
    pub async fn submit(
        &self,
        request: TeleportRequest,
    ) -> std::result::Result<TeleportReceipt, Aborted> {
        self.pipeline.submit(request).await
    }

    /// Snapshot of the live config.
    pub fn config(&self) -> Arc<ScrollConfig> {
        self.config.load()
    }

    /// Swap in a new config. Requests already in flight finish under the
    /// snapshot they started with.
    pub fn reconfigure(&self, config: ScrollConfig) -> Result<()> {
        config.validate()?;
        if config.teleport_cost > 0 && self.host.economy.is_none() {
            return Err(RuntimeError::MissingCollaborator(Collaborator::Economy));
        }
        tracing::info!(
            cooldown_secs = config.cooldown_seconds,
            max_charges = config.max_charges,
            scrolls = config.scrolls.len(),
            "Scroll config swapped"
        );
        self.config.store(config);
        Ok(())
    }

    /// Re-read the config from the configured source and apply it. The live
    /// config is untouched when reading or validation fails.
    pub fn reload(&self) -> Result<()> {
        let source = self
            .config_source
            .as_ref()
            .ok_or(RuntimeError::NoConfigSource)?;
        let config = source.reload()?;
        self.reconfigure(config)
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn sessions(&self) -> &SessionTracker {
        &self.sessions
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

/// Builder for [`ScrollRuntime`].
///
/// World, mover, permissions, and inventory are required. The location
/// repository defaults to in-memory and the clock to the system clock. An
/// economy is required only when `teleportCost` is non-zero.
pub struct ScrollRuntimeBuilder {
    config: ScrollConfig,
    world: Option<Arc<dyn WorldQuery>>,
    mover: Option<Arc<dyn EntityMover>>,
    permissions: Option<Arc<dyn PermissionGate>>,
    inventory: Option<Arc<dyn Inventory>>,
    economy: Option<Arc<dyn CostGate>>,
    repository: Option<Arc<dyn LocationRepository>>,
    clock: Option<Arc<dyn Clock>>,
    events: Option<EventBus>,
    config_source: Option<Arc<dyn ConfigSource>>,
    rng_seed: Option<u64>,
}

impl ScrollRuntimeBuilder {
    fn new() -> Self {
        Self {
            config: ScrollConfig::default(),
            world: None,
            mover: None,
            permissions: None,
            inventory: None,
            economy: None,
            repository: None,
            clock: None,
            events: None,
            config_source: None,
            rng_seed: None,
        }
    }

    pub fn config(mut self, config: ScrollConfig) -> Self {
        self.config = config;
        self
    }

    pub fn world(mut self, world: Arc<dyn WorldQuery>) -> Self {
        self.world = Some(world);
        self
    }

    pub fn mover(mut self, mover: Arc<dyn EntityMover>) -> Self {
        self.mover = Some(mover);
        self
    }

    pub fn permissions(mut self, permissions: Arc<dyn PermissionGate>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn inventory(mut self, inventory: Arc<dyn Inventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn economy(mut self, economy: Arc<dyn CostGate>) -> Self {
        self.economy = Some(economy);
        self
    }

    pub fn repository(mut self, repository: Arc<dyn LocationRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share an existing bus instead of creating one.
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Enables [`ScrollRuntime::reload`].
    pub fn config_source(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.config_source = Some(source);
        self
    }

    /// Fix the seed random destinations draw from.
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<ScrollRuntime> {
        self.config.validate()?;

        let world = self
            .world
            .ok_or(RuntimeError::MissingCollaborator(Collaborator::World))?;
        let mover = self
            .mover
            .ok_or(RuntimeError::MissingCollaborator(Collaborator::Mover))?;
        let permissions = self
            .permissions
            .ok_or(RuntimeError::MissingCollaborator(Collaborator::Permissions))?;
        let inventory = self
            .inventory
            .ok_or(RuntimeError::MissingCollaborator(Collaborator::Inventory))?;
        if self.config.teleport_cost > 0 && self.economy.is_none() {
            return Err(RuntimeError::MissingCollaborator(Collaborator::Economy));
        }

        let host = Host {
            world,
            mover,
            permissions,
            inventory,
            economy: self.economy,
        };

        let events = self.events.unwrap_or_default();
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryLocationRepo::new()));
        let registry = Arc::new(LocationRegistry::open(repository, events.clone())?);
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let cooldowns = Arc::new(CooldownTracker::new(clock));
        let sessions = Arc::new(SessionTracker::new());

        let resolver = match self.rng_seed {
            Some(seed) => SafeDestinationResolver::seeded(Arc::clone(&host.world), seed),
            None => SafeDestinationResolver::new(Arc::clone(&host.world)),
        };

        tracing::info!(
            cooldown_secs = self.config.cooldown_seconds,
            max_charges = self.config.max_charges,
            "Scroll runtime ready"
        );

        let config = Arc::new(Shared::new(self.config));
        let pipeline = Arc::new(TeleportPipeline::new(
            Arc::clone(&config),
            host.clone(),
            resolver,
            Arc::clone(&registry),
            Arc::clone(&cooldowns),
            Arc::clone(&sessions),
            events.clone(),
        ));

        Ok(ScrollRuntime {
            config,
            config_source: self.config_source,
            host,
            registry,
            cooldowns,
            sessions,
            events,
            pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryInventory, MemoryMover, MemoryWorld, StaticPermissions};

    fn builder(config: ScrollConfig) -> ScrollRuntimeBuilder {
        ScrollRuntime::builder()
            .config(config)
            .world(Arc::new(MemoryWorld::new()))
            .mover(Arc::new(MemoryMover::new()))
            .permissions(Arc::new(StaticPermissions::allow_all()))
            .inventory(Arc::new(MemoryInventory::new()))
    }

    #[test]
    fn cost_requires_economy() {
        let config = ScrollConfig {
            teleport_cost: 10,
            ..ScrollConfig::default()
        };
        assert!(matches!(
            builder(config).build(),
            Err(RuntimeError::MissingCollaborator(Collaborator::Economy))
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ScrollConfig {
            max_charges: 0,
            ..ScrollConfig::default()
        };
        assert!(matches!(builder(config).build(), Err(RuntimeError::Config(_))));
    }

    #[test]
    fn world_is_required() {
        let result = ScrollRuntime::builder()
            .mover(Arc::new(MemoryMover::new()))
            .permissions(Arc::new(StaticPermissions::allow_all()))
            .inventory(Arc::new(MemoryInventory::new()))
            .build();
        assert!(matches!(
            result,
            Err(RuntimeError::MissingCollaborator(Collaborator::World))
        ));
    }

    struct FixedSource(ScrollConfig);

    impl ConfigSource for FixedSource {
        fn reload(&self) -> std::result::Result<ScrollConfig, crate::api::HostError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn reload_swaps_the_live_config() {
        let next = ScrollConfig {
            cooldown_seconds: 2,
            max_charges: 9,
            ..ScrollConfig::default()
        };
        let runtime = builder(ScrollConfig::default())
            .config_source(Arc::new(FixedSource(next)))
            .build()
            .unwrap();
        let before = runtime.config();

        runtime.reload().unwrap();

        assert_eq!(runtime.config().max_charges, 9);
        assert_eq!(runtime.config().cooldown_seconds, 2);
        assert_eq!(before.max_charges, ScrollConfig::default().max_charges);
    }

    #[test]
    fn reload_without_source_fails() {
        let runtime = builder(ScrollConfig::default()).build().unwrap();
        assert!(matches!(runtime.reload(), Err(RuntimeError::NoConfigSource)));
    }

    #[test]
    fn reconfigure_keeps_the_old_config_on_error() {
        let runtime = builder(ScrollConfig::default()).build().unwrap();

        let invalid = ScrollConfig {
            max_charges: 0,
            ..ScrollConfig::default()
        };
        assert!(matches!(runtime.reconfigure(invalid), Err(RuntimeError::Config(_))));

        let priced = ScrollConfig {
            teleport_cost: 5,
            ..ScrollConfig::default()
        };
        assert!(matches!(
            runtime.reconfigure(priced),
            Err(RuntimeError::MissingCollaborator(Collaborator::Economy))
        ));
        assert_eq!(*runtime.config(), ScrollConfig::default());
    }

    #[test]
    fn defaults_build() {
        let runtime = builder(ScrollConfig::default()).build().unwrap();
        assert!(runtime.registry().keys().unwrap().is_empty());
        assert!(runtime.host().economy.is_none());
    }
}

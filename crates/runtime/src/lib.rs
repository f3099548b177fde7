//! Async teleport engine for scroll items.
//!
//! This crate layers concurrency and host integration over `scroll-core`.
//! Hosts build a [`ScrollRuntime`], feed it player presence and "use scroll"
//! actions, and subscribe to its events.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the service container and builder
//! - [`api`] exposes the errors and host capability traits
//! - [`pipeline`] runs a request from validation to relocation
//! - [`registry`], [`cooldown`], [`resolver`] and [`session`] are the services the pipeline consults
//! - [`commands`] is the administrative control surface
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`repository`] persists the location registry
//! - [`host`] provides in-memory collaborators for tests and local runs
pub mod api;
pub mod commands;
pub mod cooldown;
pub mod events;
pub mod host;
pub mod pipeline;
pub mod registry;
pub mod repository;
pub mod resolver;
pub mod runtime;
pub mod session;
pub mod utils;

pub use api::{
    CommandError, ConfigSource, CostGate, EntityMover, Host, HostError, Inventory, PermissionGate,
    RegistryError, Result, RuntimeError, WorldQuery, capability,
};
pub use commands::{Command, CommandOutcome};
pub use cooldown::CooldownTracker;
pub use events::{Event, EventBus, RegistryEvent, TeleportEvent, Topic};
pub use pipeline::{Aborted, Stage, TeleportPipeline, TeleportReceipt, TeleportRequest};
pub use registry::LocationRegistry;
pub use repository::{
    BindingMap, FileLocationRepository, InMemoryLocationRepo, LocationRepository, RepositoryError,
};
pub use resolver::{RANDOM_ATTEMPTS, RANDOM_SPREAD, SafeDestinationResolver};
pub use runtime::{ScrollRuntime, ScrollRuntimeBuilder};
pub use session::{Interrupt, SessionTracker, SessionWatch};
pub use utils::{Clock, ManualClock, Shared, SystemClock, Timestamp};

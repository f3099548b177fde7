//! Public runtime API surface.
//!
//! Errors and the host capability traits live here so the services and the
//! pipeline can share them without depending on each other.

pub mod errors;
pub mod host;

pub use errors::{
    Collaborator, CommandError, HostError, RegistryError, RepositoryError, Result, RuntimeError,
};
pub use host::{
    ConfigSource, CostGate, EntityMover, Host, Inventory, PermissionGate, WorldQuery, capability,
};

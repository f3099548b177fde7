//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from host collaborators, the location registry, and the
//! control surface so callers can report them with consistent context.
use std::fmt;

use scroll_core::{
    BindingKey, BindingKeyError, CoordinateError, DestinationParseError, ItemError, PlayerId,
    TeleportError,
};
use thiserror::Error;

pub use crate::repository::RepositoryError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Failure reported by a host collaborator (world, inventory, economy).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("world '{0}' is not loaded on this server")]
    UnknownWorld(String),

    #[error("player {0} is not present")]
    UnknownPlayer(PlayerId),

    #[error("host rejected the request: {0}")]
    Rejected(String),

    #[error("host service unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while assembling the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime requires a {0} collaborator before building")]
    MissingCollaborator(Collaborator),

    #[error("invalid scroll config: {0}")]
    Config(#[from] scroll_core::ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("config source failed: {0}")]
    Source(#[from] HostError),

    #[error("runtime has no config source to reload from")]
    NoConfigSource,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Collaborator {
    World,
    Mover,
    Permissions,
    Economy,
    Inventory,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Collaborator::World => "world",
            Collaborator::Mover => "entity mover",
            Collaborator::Permissions => "permission",
            Collaborator::Economy => "economy",
            Collaborator::Inventory => "inventory",
        };
        write!(f, "{}", label)
    }
}

/// Lookup failures from the location registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no location bound to '{0}'")]
    NotFound(BindingKey),

    #[error("location '{0}' is unavailable until its last write is retried")]
    Unavailable(BindingKey),

    #[error("invalid location: {0}")]
    InvalidLocation(#[from] CoordinateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Errors raised by the administrative control surface.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("missing capability '{0}'")]
    MissingCapability(&'static str),

    #[error("unknown binding key '{0}'")]
    UnknownKey(BindingKey),

    #[error("charges must be between 1 and {max} (got {requested})")]
    InvalidCharges { requested: u32, max: u32 },

    #[error("player {0} is not online")]
    PlayerOffline(PlayerId),

    #[error("player {0} is not holding a scroll")]
    NoScrollHeld(PlayerId),

    #[error("unknown scroll kind '{0}'")]
    UnknownScroll(String),

    #[error("reload failed: {0}")]
    Reload(#[from] RuntimeError),

    #[error(transparent)]
    Key(#[from] BindingKeyError),

    #[error(transparent)]
    Destination(#[from] DestinationParseError),

    #[error(transparent)]
    Item(#[from] ItemError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Teleport(#[from] crate::pipeline::Aborted),
}

impl CommandError {
    /// Message catalog key for this error.
    pub fn key(&self) -> &'static str {
        match self {
            CommandError::Usage(_) => "usage",
            CommandError::MissingCapability(_) => "missing_capability",
            CommandError::UnknownKey(_) => "unknown_key",
            CommandError::InvalidCharges { .. } => "invalid_charges",
            CommandError::PlayerOffline(_) => "player_offline",
            CommandError::NoScrollHeld(_) => "no_scroll_held",
            CommandError::UnknownScroll(_) => "unknown_scroll",
            CommandError::Reload(_) => "reload_failed",
            CommandError::Key(_) | CommandError::Destination(_) | CommandError::Item(_) => "usage",
            CommandError::Registry(RegistryError::NotFound(_)) => "not_bound",
            CommandError::Registry(RegistryError::InvalidLocation(_)) => "invalid_location",
            CommandError::Registry(_) | CommandError::Host(_) => "execution_failed",
            CommandError::Teleport(aborted) => aborted.reason.key(),
        }
    }

    /// The teleport outcome, when this error wraps an aborted request.
    pub fn teleport(&self) -> Option<&TeleportError> {
        match self {
            CommandError::Teleport(aborted) => Some(&aborted.reason),
            _ => None,
        }
    }
}

//! Repository contracts for durable scroll data.

use std::collections::BTreeMap;

use scroll_core::{BindingKey, Destination};

use super::Result;

/// Key-to-destination mapping as persisted.
pub type BindingMap = BTreeMap<BindingKey, Destination>;

/// Durable storage for the location registry.
///
/// Implementations persist the whole mapping on every write. A successful
/// `persist` must survive a restart; a failed one must leave the previously
/// persisted mapping intact.
pub trait LocationRepository: Send + Sync {
    /// Load every binding. A store that was never written yields an empty map.
    fn load(&self) -> Result<BindingMap>;

    /// Replace the persisted mapping with `bindings`.
    fn persist(&self, bindings: &BindingMap) -> Result<()>;
}

//! Durable key-to-destination bindings.
//!
//! Every mutation is written through to the [`LocationRepository`] before the
//! call returns. Readers and writers share one `RwLock`, so a resolve sees
//! either the old or the new destination for a key, never a partial write.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use scroll_core::{BindingKey, Destination};

use crate::api::{RegistryError, RepositoryError};
use crate::events::{EventBus, RegistryEvent};
use crate::repository::{BindingMap, LocationRepository};

#[derive(Default)]
struct RegistryState {
    bindings: BindingMap,
    /// Keys whose latest change has not reached the repository.
    unavailable: HashSet<BindingKey>,
}

pub struct LocationRegistry {
    repository: Arc<dyn LocationRepository>,
    state: RwLock<RegistryState>,
    events: EventBus,
}

impl LocationRegistry {
    /// Load the persisted bindings from `repository`.
    pub fn open(
        repository: Arc<dyn LocationRepository>,
        events: EventBus,
    ) -> Result<Self, RegistryError> {
        let bindings = repository.load()?;
        tracing::info!("Location registry opened with {} bindings", bindings.len());
        Ok(Self {
            repository,
            state: RwLock::new(RegistryState {
                bindings,
                unavailable: HashSet::new(),
            }),
            events,
        })
    }

    /// Bind `key` to `destination`, replacing any previous binding.
    ///
    /// Destinations with coordinates off the block grid are refused before
    /// anything is written. If the write-through fails the new destination is
    /// kept in memory but the key resolves as [`RegistryError::Unavailable`]
    /// until a later bind or unbind persists the map successfully.
    pub fn bind(
        &self,
        key: BindingKey,
        destination: impl Into<Destination>,
    ) -> Result<(), RegistryError> {
        let destination = destination.into();
        destination.validate()?;

        self.write(&key, |bindings| {
            bindings.insert(key.clone(), destination.clone());
        })?;

        tracing::info!(key = %key, "Bound to {}", destination);
        self.events.publish(RegistryEvent::Bound { key, destination });
        Ok(())
    }

    /// Remove `key`. Returns `false` when it was not bound.
    pub fn unbind(&self, key: &BindingKey) -> Result<bool, RegistryError> {
        if !self.read()?.bindings.contains_key(key) {
            return Ok(false);
        }

        let removed = self.write(key, |bindings| bindings.remove(key).is_some())?;
        if removed {
            tracing::info!(key = %key, "Unbound");
            self.events.publish(RegistryEvent::Unbound { key: key.clone() });
        }
        Ok(removed)
    }

    pub fn resolve(&self, key: &BindingKey) -> Result<Destination, RegistryError> {
        let state = self.read()?;
        if state.unavailable.contains(key) {
            return Err(RegistryError::Unavailable(key.clone()));
        }
        state
            .bindings
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.clone()))
    }

    pub fn contains(&self, key: &BindingKey) -> Result<bool, RegistryError> {
        Ok(self.read()?.bindings.contains_key(key))
    }

    /// Bound keys in sorted order.
    pub fn keys(&self) -> Result<Vec<BindingKey>, RegistryError> {
        Ok(self.read()?.bindings.keys().cloned().collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, RegistryState>, RegistryError> {
        self.state
            .read()
            .map_err(|_| RegistryError::Repository(RepositoryError::LockPoisoned))
    }

    fn lock_for_write(&self) -> Result<RwLockWriteGuard<'_, RegistryState>, RegistryError> {
        self.state
            .write()
            .map_err(|_| RegistryError::Repository(RepositoryError::LockPoisoned))
    }

    /// Apply `change` and persist the whole map while holding the write lock.
    fn write<R>(
        &self,
        key: &BindingKey,
        change: impl FnOnce(&mut BindingMap) -> R,
    ) -> Result<R, RegistryError> {
        let mut state = self.lock_for_write()?;
        let result = change(&mut state.bindings);

        match self.repository.persist(&state.bindings) {
            Ok(()) => {
                if !state.unavailable.is_empty() {
                    tracing::info!(
                        "Persisted {} previously failed binding changes",
                        state.unavailable.len()
                    );
                    state.unavailable.clear();
                }
                Ok(result)
            }
            Err(error) => {
                tracing::warn!(key = %key, "Failed to persist locations: {}", error);
                state.unavailable.insert(key.clone());
                Err(error.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scroll_core::{CoordinateError, Orientation, SavedLocation, Vec3, WorldId};

    use super::*;
    use crate::repository::InMemoryLocationRepo;

    fn key(raw: &str) -> BindingKey {
        BindingKey::parse(raw).unwrap()
    }

    fn home() -> Destination {
        SavedLocation::new(
            WorldId::new("overworld"),
            Vec3::new(10.25, 64.0, -3.5),
            Orientation::new(90.0, -15.0),
        )
        .into()
    }

    fn registry() -> (Arc<InMemoryLocationRepo>, LocationRegistry) {
        let repo = Arc::new(InMemoryLocationRepo::new());
        let registry = LocationRegistry::open(repo.clone(), EventBus::new()).unwrap();
        (repo, registry)
    }

    #[test]
    fn bind_then_resolve_returns_same_location() {
        let (repo, registry) = registry();
        registry.bind(key("home"), home()).unwrap();

        assert_eq!(registry.resolve(&key("home")).unwrap(), home());
        assert_eq!(repo.snapshot().unwrap().get(&key("home")), Some(&home()));
    }

    #[test]
    fn rebind_overwrites() {
        let (_, registry) = registry();
        registry.bind(key("home"), home()).unwrap();
        let other = Destination::Random {
            world: Some(WorldId::new("nether")),
        };
        registry.bind(key("home"), other.clone()).unwrap();
        assert_eq!(registry.resolve(&key("home")).unwrap(), other);
        assert_eq!(registry.keys().unwrap(), vec![key("home")]);
    }

    #[test]
    fn unbind_reports_absence() {
        let (_, registry) = registry();
        assert!(!registry.unbind(&key("home")).unwrap());
        registry.bind(key("home"), home()).unwrap();
        assert!(registry.unbind(&key("home")).unwrap());
        assert!(matches!(
            registry.resolve(&key("home")),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn failed_write_makes_key_unavailable_until_next_success() {
        let (repo, registry) = registry();
        repo.fail_writes(true);
        assert!(registry.bind(key("home"), home()).is_err());
        assert!(matches!(
            registry.resolve(&key("home")),
            Err(RegistryError::Unavailable(_))
        ));
        assert!(repo.snapshot().unwrap().is_empty());

        repo.fail_writes(false);
        registry
            .bind(key("spawn"), SavedLocation::at_block(WorldId::new("overworld"), 0, 70, 0))
            .unwrap();

        assert_eq!(registry.resolve(&key("home")).unwrap(), home());
        assert_eq!(repo.snapshot().unwrap().len(), 2);
    }

    #[test]
    fn reopen_sees_persisted_bindings() {
        let (repo, registry) = registry();
        registry.bind(key("home"), home()).unwrap();
        drop(registry);

        let reopened = LocationRegistry::open(repo, EventBus::new()).unwrap();
        assert_eq!(reopened.resolve(&key("home")).unwrap(), home());
    }

    #[test]
    fn refuses_locations_off_the_grid() {
        let (repo, registry) = registry();
        let far = SavedLocation::new(
            WorldId::new("overworld"),
            Vec3::new(0.0, 3.0e9, 0.0),
            Orientation::default(),
        );
        assert!(matches!(
            registry.bind(key("far"), far),
            Err(RegistryError::InvalidLocation(CoordinateError::OutOfRange { axis: "y" }))
        ));

        let lost = SavedLocation::new(
            WorldId::new("overworld"),
            Vec3::new(f64::NAN, 64.0, 0.0),
            Orientation::default(),
        );
        assert!(matches!(
            registry.bind(key("lost"), lost),
            Err(RegistryError::InvalidLocation(CoordinateError::NonFinite { axis: "x" }))
        ));

        assert!(!registry.contains(&key("far")).unwrap());
        assert!(repo.snapshot().unwrap().is_empty());
    }
}

//! In-memory LocationRepository implementation for tests and local runs.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::repository::{BindingMap, LocationRepository, RepositoryError, Result};

/// Keeps the persisted mapping in process memory.
///
/// `fail_writes` makes every subsequent `persist` fail without touching the
/// stored map, which lets tests drive the registry's failure path.
#[derive(Default)]
pub struct InMemoryLocationRepo {
    locations: RwLock<BindingMap>,
    fail_writes: AtomicBool,
}

impl InMemoryLocationRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locations(locations: BindingMap) -> Self {
        Self {
            locations: RwLock::new(locations),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of what has been persisted so far.
    pub fn snapshot(&self) -> Result<BindingMap> {
        self.load()
    }
}

impl LocationRepository for InMemoryLocationRepo {
    fn load(&self) -> Result<BindingMap> {
        let locations = self
            .locations
            .read()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        Ok(locations.clone())
    }

    fn persist(&self, bindings: &BindingMap) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Rejected("writes disabled".into()));
        }
        let mut stored = self
            .locations
            .write()
            .map_err(|_| RepositoryError::LockPoisoned)?;
        *stored = bindings.clone();
        Ok(())
    }
}

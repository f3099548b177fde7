//! A value that readers snapshot and a single writer swaps wholesale.

use std::sync::{Arc, PoisonError, RwLock};

/// Holds the current `Arc<T>`. Readers clone the `Arc` and keep using their
/// snapshot even after a writer replaces it.
pub struct Shared<T> {
    current: RwLock<Arc<T>>,
}

impl<T> Shared<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: RwLock::new(Arc::new(value)),
        }
    }

    /// The value as of now.
    pub fn load(&self) -> Arc<T> {
        // Only whole Arcs are ever written, so a poisoned lock still holds one.
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the value, returning the previous one.
    pub fn store(&self, value: T) -> Arc<T> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, Arc::new(value))
    }
}

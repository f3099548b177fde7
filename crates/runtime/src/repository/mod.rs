//! Repository layer for data that must outlive a restart.
//!
//! Only the location registry is durable. Cooldowns, sessions, and in-flight
//! requests are runtime state and are lost on shutdown.

mod error;
pub mod file;
pub mod memory;
mod traits;

pub use error::{RepositoryError, Result};
pub use file::FileLocationRepository;
pub use memory::InMemoryLocationRepo;
pub use traits::{BindingMap, LocationRepository};

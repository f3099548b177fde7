//! In-memory repository implementations for testing and development.

mod locations;

pub use locations::InMemoryLocationRepo;

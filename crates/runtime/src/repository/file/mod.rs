//! File-based repository implementations.

mod locations;

pub use locations::FileLocationRepository;

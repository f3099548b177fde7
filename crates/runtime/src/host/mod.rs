//! In-process host collaborators.
//!
//! These back the integration tests and the reference server. They keep all
//! state in memory and expose switches for the failure paths the pipeline
//! must survive.

mod memory;

pub use memory::{MemoryEconomy, MemoryInventory, MemoryMover, MemoryWorld, StaticPermissions};

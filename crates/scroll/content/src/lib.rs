//! File-backed content for the scroll engine.
//!
//! Loads administrator-editable TOML files (engine configuration and the
//! player message catalog) into the types consumed by the runtime.
pub mod loaders;
pub mod messages;

pub use loaders::{ConfigLoader, MessageLoader};
pub use messages::MessageCatalog;

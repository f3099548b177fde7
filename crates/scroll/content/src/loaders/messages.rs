//! Message catalog loader.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::loaders::{LoadResult, read_file};
use crate::messages::MessageCatalog;

/// On-disk layout of `messages.toml`.
///
/// ```toml
/// prefix = "[Scrolls]"
///
/// [messages]
/// on_cooldown = "Wait {seconds}s before reading another scroll."
/// ```
#[derive(Debug, Default, Deserialize)]
struct MessagesFile {
    prefix: Option<String>,
    #[serde(default)]
    messages: HashMap<String, String>,
}

/// Loader for player-facing messages from TOML files.
pub struct MessageLoader;

impl MessageLoader {
    /// Load overrides on top of the built-in catalog.
    pub fn load(path: &Path) -> LoadResult<MessageCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<MessageCatalog> {
        let file: MessagesFile = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse messages TOML: {}", e))?;

        let mut catalog = MessageCatalog::default();
        if let Some(prefix) = file.prefix {
            catalog.set_prefix(prefix);
        }
        for (key, text) in file.messages {
            if !catalog.contains(&key) {
                tracing::warn!("Unknown message key '{}' in messages file", key);
            }
            catalog.set(key, text);
        }
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use scroll_core::TeleportError;

    use super::*;

    #[test]
    fn overrides_defaults() {
        let catalog = MessageLoader::parse(
            r#"
            prefix = "[TP]"

            [messages]
            on_cooldown = "Slow down, {seconds}s left"
            "#,
        )
        .unwrap();

        assert_eq!(
            catalog.teleport(&TeleportError::OnCooldown { remaining_secs: 7 }),
            "[TP] Slow down, 7s left"
        );
        assert_eq!(
            catalog.teleport(&TeleportError::NoBinding),
            "[TP] This scroll is not bound to a destination."
        );
    }
}

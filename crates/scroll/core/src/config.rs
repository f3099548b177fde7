//! Teleport tuning parameters.
use std::collections::BTreeMap;
use std::time::Duration;

use crate::safety::{Footprint, LandingScan, VerticalPreference};

/// Errors raised by [`ScrollConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("maxCharges must be positive")]
    ZeroMaxCharges,

    #[error("entity footprint must be at least one block in each dimension")]
    EmptyFootprint,

    #[error("safeSearchRadius must be at most {max}")]
    SearchRadiusTooLarge { max: u32 },

    #[error("entity footprint must be at most {max} blocks in each dimension")]
    FootprintTooLarge { max: u32 },

    #[error("scroll template names cannot be empty")]
    EmptyTemplateName,
}

/// Per-scroll settings stamped onto an item when it is issued.
///
/// Unset fields fall back to the engine-wide value at use time.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ScrollTemplate {
    pub warmup_seconds: Option<u64>,
    pub cancel_on_move: Option<bool>,
    pub cooldown_seconds: Option<u64>,
}

/// Engine-wide scroll configuration.
///
/// Field names serialise in camelCase to match the keys administrators use
/// in `config.toml`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ScrollConfig {
    /// Seconds a player waits between successful teleports.
    pub cooldown_seconds: u64,
    /// Charges on a freshly issued scroll.
    pub max_charges: u32,
    /// Vertical search window (blocks) around the bound height.
    pub safe_search_radius: u32,
    /// Upper bound on waiting for destination chunks to load.
    pub chunk_load_timeout_millis: u64,
    /// Remove the item from the inventory once its last charge is spent.
    pub consume_on_empty: bool,
    /// Delay between activation and departure.
    pub warmup_seconds: u64,
    /// Abort a warming-up teleport when the player moves.
    pub cancel_on_move: bool,
    /// Currency charged per teleport; zero skips the economy call.
    pub teleport_cost: u64,
    pub entity_height: u32,
    pub entity_width: u32,
    pub vertical_preference: VerticalPreference,
    /// Named scroll kinds selectable when issuing a scroll.
    pub scrolls: BTreeMap<String, ScrollTemplate>,
}

impl ScrollConfig {
    pub const DEFAULT_COOLDOWN_SECONDS: u64 = 30;
    pub const DEFAULT_MAX_CHARGES: u32 = 1;
    pub const DEFAULT_SAFE_SEARCH_RADIUS: u32 = 8;
    pub const DEFAULT_CHUNK_LOAD_TIMEOUT_MILLIS: u64 = 5_000;
    pub const DEFAULT_ENTITY_HEIGHT: u32 = 2;
    pub const DEFAULT_ENTITY_WIDTH: u32 = 1;
    pub const MAX_SAFE_SEARCH_RADIUS: u32 = 4_096;
    pub const MAX_ENTITY_SIZE: u32 = 16;

    pub fn new() -> Self {
        Self {
            cooldown_seconds: Self::DEFAULT_COOLDOWN_SECONDS,
            max_charges: Self::DEFAULT_MAX_CHARGES,
            safe_search_radius: Self::DEFAULT_SAFE_SEARCH_RADIUS,
            chunk_load_timeout_millis: Self::DEFAULT_CHUNK_LOAD_TIMEOUT_MILLIS,
            consume_on_empty: true,
            warmup_seconds: 0,
            cancel_on_move: true,
            teleport_cost: 0,
            entity_height: Self::DEFAULT_ENTITY_HEIGHT,
            entity_width: Self::DEFAULT_ENTITY_WIDTH,
            vertical_preference: VerticalPreference::default(),
            scrolls: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_charges == 0 {
            return Err(ConfigError::ZeroMaxCharges);
        }
        if self.entity_height == 0 || self.entity_width == 0 {
            return Err(ConfigError::EmptyFootprint);
        }
        if self.entity_height > Self::MAX_ENTITY_SIZE || self.entity_width > Self::MAX_ENTITY_SIZE {
            return Err(ConfigError::FootprintTooLarge {
                max: Self::MAX_ENTITY_SIZE,
            });
        }
        if self.safe_search_radius > Self::MAX_SAFE_SEARCH_RADIUS {
            return Err(ConfigError::SearchRadiusTooLarge {
                max: Self::MAX_SAFE_SEARCH_RADIUS,
            });
        }
        if self.scrolls.keys().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::EmptyTemplateName);
        }
        Ok(())
    }

    /// Template registered under `name`, matched case-insensitively.
    pub fn template(&self, name: &str) -> Option<&ScrollTemplate> {
        self.scrolls
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, template)| template)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_seconds)
    }

    pub fn chunk_load_timeout(&self) -> Duration {
        Duration::from_millis(self.chunk_load_timeout_millis)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_seconds)
    }

    pub fn footprint(&self) -> Footprint {
        Footprint::new(self.entity_height, self.entity_width)
    }

    pub fn landing_scan(&self) -> LandingScan {
        LandingScan {
            radius: self.safe_search_radius,
            footprint: self.footprint(),
            preference: self.vertical_preference,
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScrollConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cooldown(), Duration::from_secs(30));
        assert_eq!(config.chunk_load_timeout(), Duration::from_secs(5));
        assert_eq!(config.footprint(), Footprint::new(2, 1));
    }

    #[test]
    fn rejects_degenerate_values() {
        let config = ScrollConfig {
            max_charges: 0,
            ..ScrollConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxCharges));

        let config = ScrollConfig {
            entity_width: 0,
            ..ScrollConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyFootprint));
    }

    #[test]
    fn caps_search_radius_and_footprint() {
        let config = ScrollConfig {
            safe_search_radius: u32::MAX,
            ..ScrollConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::SearchRadiusTooLarge {
                max: ScrollConfig::MAX_SAFE_SEARCH_RADIUS
            })
        );

        let config = ScrollConfig {
            safe_search_radius: ScrollConfig::MAX_SAFE_SEARCH_RADIUS,
            ..ScrollConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = ScrollConfig {
            entity_width: 3_000_000_000,
            ..ScrollConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::FootprintTooLarge {
                max: ScrollConfig::MAX_ENTITY_SIZE
            })
        );
    }

    #[test]
    fn templates_match_case_insensitively() {
        let mut config = ScrollConfig::default();
        config.scrolls.insert(
            "Slow".into(),
            ScrollTemplate {
                warmup_seconds: Some(5),
                ..ScrollTemplate::default()
            },
        );
        assert_eq!(config.template("slow").and_then(|t| t.warmup_seconds), Some(5));
        assert!(config.template("fast").is_none());

        config.scrolls.insert(" ".into(), ScrollTemplate::default());
        assert_eq!(config.validate(), Err(ConfigError::EmptyTemplateName));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialises_camel_case_keys_with_defaults() {
        let config: ScrollConfig = serde_json::from_str(
            r#"{"cooldownSeconds": 5, "consumeOnEmpty": false, "verticalPreference": "nearest"}"#,
        )
        .unwrap();
        assert_eq!(config.cooldown_seconds, 5);
        assert!(!config.consume_on_empty);
        assert_eq!(config.vertical_preference, VerticalPreference::Nearest);
        assert_eq!(config.max_charges, ScrollConfig::DEFAULT_MAX_CHARGES);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialises_scroll_templates() {
        let config: ScrollConfig = serde_json::from_str(
            r#"{"scrolls": {"slow": {"warmupSeconds": 5, "cancelOnMove": false}}}"#,
        )
        .unwrap();
        let slow = config.template("slow").unwrap();
        assert_eq!(slow.warmup_seconds, Some(5));
        assert_eq!(slow.cancel_on_move, Some(false));
        assert_eq!(slow.cooldown_seconds, None);
    }
}

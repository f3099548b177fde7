//! Player-facing message templates.
use std::collections::HashMap;

use scroll_core::TeleportError;

const DEFAULT_PREFIX: &str = "[Scrolls]";

const DEFAULTS: &[(&str, &str)] = &[
    ("no_binding", "This scroll is not bound to a destination."),
    ("no_charges", "This scroll has no charges left."),
    ("destination_unavailable", "The destination '{key}' is unavailable."),
    ("unsafe_destination", "There is no safe place to land near the destination."),
    ("on_cooldown", "You must wait {seconds}s before using another scroll."),
    ("forbidden", "You don't have permission to use this scroll!"),
    ("insufficient_cost", "You cannot afford the teleport cost of {cost}."),
    ("execution_failed", "An error occurred during teleportation!"),
    ("invalid_state", "An error occurred during teleportation!"),
    ("timeout", "The destination took too long to load."),
    ("cancelled", "Teleportation cancelled because you moved."),
    ("abandoned", "Teleportation abandoned."),
    ("warmup", "Teleporting in {seconds} seconds..."),
    ("teleported", "You have been teleported to {destination}!"),
    ("bound", "Bound '{key}' to {destination}."),
    ("unbound", "Removed binding '{key}'."),
    ("not_bound", "No binding named '{key}' exists."),
    ("given", "Gave {player} a scroll to '{key}' with {charges} charges."),
    ("unknown_key", "Unknown binding key '{key}'."),
    ("missing_capability", "You need the '{capability}' permission to do that."),
    ("invalid_charges", "Charges must be between 1 and {max}."),
    ("player_offline", "Player {player} is not online."),
    ("no_scroll_held", "You are not holding a scroll."),
    ("invalid_location", "That location cannot be bound: {reason}."),
    ("unknown_scroll", "Unknown scroll kind '{scroll}'."),
    ("reloaded", "Configuration reloaded."),
    ("reload_failed", "Reload failed: {reason}"),
    ("listed", "Bindings: {keys}"),
    ("usage", "Usage: {usage}"),
];

/// Message templates keyed by outcome, with `{name}` placeholders.
#[derive(Clone, Debug)]
pub struct MessageCatalog {
    prefix: String,
    templates: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn set(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    /// Render `key` with its placeholders substituted, prefixed.
    ///
    /// Unknown keys render as the key itself so a typo stays visible.
    pub fn render(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut text = self
            .templates
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_owned());
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        if self.prefix.is_empty() {
            text
        } else {
            format!("{} {}", self.prefix, text)
        }
    }

    /// Message shown to the player whose teleport aborted with `error`.
    pub fn teleport(&self, error: &TeleportError) -> String {
        match error {
            TeleportError::DestinationUnavailable(key) => {
                self.render(error.key(), &[("key", key.as_str())])
            }
            TeleportError::OnCooldown { remaining_secs } => {
                self.render(error.key(), &[("seconds", &remaining_secs.to_string())])
            }
            TeleportError::InsufficientCost { cost } => {
                self.render(error.key(), &[("cost", &cost.to_string())])
            }
            _ => self.render(error.key(), &[]),
        }
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_owned(),
            templates: DEFAULTS
                .iter()
                .map(|(key, text)| ((*key).to_owned(), (*text).to_owned()))
                .collect(),
        }
    }
}

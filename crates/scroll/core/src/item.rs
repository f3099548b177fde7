//! Scroll item state and its transitions.
//!
//! A [`ScrollItem`] is a value: every transition returns a new state and the
//! caller decides when to store it. This keeps the charge arithmetic free of
//! locking concerns; the runtime serialises writers per [`ItemId`].

use std::time::Duration;

use crate::config::ScrollTemplate;
use crate::error::TeleportError;
use crate::ids::{BindingKey, BindingKeyError, ItemId};

/// Errors raised while constructing or decoding an item.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ItemError {
    #[error("max charges must be positive")]
    ZeroMaxCharges,

    #[error("charges {charges} exceed max charges {max}")]
    TooManyCharges { charges: u32, max: u32 },

    #[error("invalid bound key: {0}")]
    Key(#[from] BindingKeyError),
}

/// Teleport charge state carried by one scroll item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrollItem {
    id: ItemId,
    bound_key: Option<BindingKey>,
    charges: u32,
    max_charges: u32,
    cooldown_override: Option<Duration>,
    warmup_override: Option<Duration>,
    cancel_on_move: Option<bool>,
}

impl ScrollItem {
    /// A fully charged, unbound scroll.
    pub fn new(id: ItemId, max_charges: u32) -> Result<Self, ItemError> {
        Self::with_charges(id, max_charges, max_charges)
    }

    pub fn with_charges(id: ItemId, charges: u32, max_charges: u32) -> Result<Self, ItemError> {
        if max_charges == 0 {
            return Err(ItemError::ZeroMaxCharges);
        }
        if charges > max_charges {
            return Err(ItemError::TooManyCharges {
                charges,
                max: max_charges,
            });
        }
        Ok(Self {
            id,
            bound_key: None,
            charges,
            max_charges,
            cooldown_override: None,
            warmup_override: None,
            cancel_on_move: None,
        })
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn bound_key(&self) -> Option<&BindingKey> {
        self.bound_key.as_ref()
    }

    pub fn charges(&self) -> u32 {
        self.charges
    }

    pub fn max_charges(&self) -> u32 {
        self.max_charges
    }

    pub fn cooldown_override(&self) -> Option<Duration> {
        self.cooldown_override
    }

    /// Cooldown applied after a successful teleport with this item.
    pub fn cooldown(&self, default: Duration) -> Duration {
        self.cooldown_override.unwrap_or(default)
    }

    /// Delay between activation and departure for this item.
    pub fn warmup(&self, default: Duration) -> Duration {
        self.warmup_override.unwrap_or(default)
    }

    /// Whether moving during the warmup aborts a teleport with this item.
    pub fn cancels_on_move(&self, default: bool) -> bool {
        self.cancel_on_move.unwrap_or(default)
    }

    pub fn can_consume(&self) -> bool {
        self.charges > 0
    }

    /// State after spending one charge.
    ///
    /// Spending from an empty scroll is a caller bug: the pipeline checks
    /// [`ScrollItem::can_consume`] first, so reaching zero here means two
    /// writers raced past the per-item lock.
    pub fn consume(&self) -> Result<Self, TeleportError> {
        let charges = self.charges.checked_sub(1).ok_or_else(|| {
            TeleportError::InvalidState(format!("consume called on {} with no charges", self.id))
        })?;
        Ok(Self {
            charges,
            ..self.clone()
        })
    }

    /// State bound to `key`; charges are untouched.
    pub fn bind(&self, key: BindingKey) -> Self {
        Self {
            bound_key: Some(key),
            ..self.clone()
        }
    }

    pub fn with_cooldown_override(self, cooldown: Option<Duration>) -> Self {
        Self {
            cooldown_override: cooldown,
            ..self
        }
    }

    /// Stamp the settings of a named scroll kind onto the item.
    pub fn with_template(self, template: &ScrollTemplate) -> Self {
        Self {
            cooldown_override: template.cooldown_seconds.map(Duration::from_secs),
            warmup_override: template.warmup_seconds.map(Duration::from_secs),
            cancel_on_move: template.cancel_on_move,
            ..self
        }
    }

    /// Decode the tag the host persists on the item instance.
    pub fn from_tag(id: ItemId, tag: &ItemTag, max_charges: u32) -> Result<Self, ItemError> {
        let mut item = Self::with_charges(id, tag.charges, max_charges)?;
        if let Some(raw) = &tag.bound_key {
            item.bound_key = Some(BindingKey::parse(raw)?);
        }
        item.cooldown_override = tag.cooldown_seconds.map(Duration::from_secs);
        item.warmup_override = tag.warmup_seconds.map(Duration::from_secs);
        item.cancel_on_move = tag.cancel_on_move;
        Ok(item)
    }

    pub fn to_tag(&self) -> ItemTag {
        ItemTag {
            bound_key: self.bound_key.as_ref().map(|key| key.as_str().to_owned()),
            charges: self.charges,
            cooldown_seconds: self.cooldown_override.map(|d| d.as_secs()),
            warmup_seconds: self.warmup_override.map(|d| d.as_secs()),
            cancel_on_move: self.cancel_on_move,
        }
    }
}

/// Opaque tag stored on the item by the host inventory.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ItemTag {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub bound_key: Option<String>,
    pub charges: u32,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub cooldown_seconds: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub warmup_seconds: Option<u64>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub cancel_on_move: Option<bool>,
}

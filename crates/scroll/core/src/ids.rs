//! Identifiers shared by every layer of the teleport engine.
use std::fmt;

/// Unique identifier of a connected player as assigned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Identity of a single scroll item instance.
///
/// Charge consumption is serialised per `ItemId`, so two stacks that look
/// identical to the player never share a lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Name of a world known to the host engine.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct WorldId(String);

impl WorldId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors raised when a binding key fails validation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindingKeyError {
    #[error("binding key cannot be empty")]
    Empty,

    #[error("binding key '{0}' must not contain whitespace")]
    Whitespace(String),
}

/// Named reference to a saved location.
///
/// Keys are case-insensitive: they are trimmed and lowercased on parse so
/// `Home` and `home` address the same registry entry.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct BindingKey(String);

impl BindingKey {
    pub fn parse(raw: &str) -> Result<Self, BindingKeyError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BindingKeyError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(BindingKeyError::Whitespace(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BindingKey {
    type Error = BindingKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BindingKey> for String {
    fn from(key: BindingKey) -> Self {
        key.0
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//! Outcomes that terminate a teleport request.

/// Reason a teleport request was aborted.
///
/// Every variant except [`TeleportError::InvalidState`] is an ordinary,
/// player-facing outcome. `InvalidState` marks a broken internal invariant;
/// it aborts the single request but never the host.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TeleportError {
    #[error("this scroll is not bound to a destination")]
    NoBinding,

    #[error("this scroll has no charges left")]
    NoCharges,

    #[error("the destination '{0}' is unavailable")]
    DestinationUnavailable(String),

    #[error("no safe place to land near the destination")]
    UnsafeDestination,

    #[error("scrolls are on cooldown for another {remaining_secs}s")]
    OnCooldown { remaining_secs: u64 },

    #[error("you are not allowed to use scrolls")]
    Forbidden,

    #[error("you cannot afford the teleport cost of {cost}")]
    InsufficientCost { cost: u64 },

    #[error("teleport failed: {0}")]
    ExecutionFailed(String),

    #[error("internal error: {0}")]
    InvalidState(String),

    #[error("destination terrain did not load in time")]
    Timeout,

    #[error("teleport cancelled because you moved")]
    Cancelled,

    #[error("teleport abandoned because the player left")]
    Abandoned,
}

impl TeleportError {
    /// Stable snake_case key, used to look up configurable messages.
    pub fn key(&self) -> &'static str {
        self.into()
    }

    /// Whether the error is an ordinary outcome rather than an invariant breach.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TeleportError::InvalidState(_))
    }
}

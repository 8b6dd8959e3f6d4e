use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Typed outcomes surfaced to the caller. Everything here except `Storage`
/// is an expected branch the UI layer handles deterministically; transient
/// storage conflicts are retried internally and only become
/// `TransactionConflict` once the retry budget is spent.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Daily allowance spent. Recoverable tomorrow or via tier upgrade.
    #[error("daily swipe quota exhausted (limit {limit})")]
    QuotaExceeded { limit: u32 },

    /// Self-swipe, malformed id, or a target that isn't provisioned.
    /// Rejected with no state change.
    #[error("invalid swipe target")]
    InvalidTarget,

    /// The acting account is missing — a provisioning inconsistency,
    /// never silently defaulted.
    #[error("account not found: {0}")]
    AccountNotFound(Uuid),

    /// Storage conflict survived the bounded retry loop.
    #[error("storage conflict, try again")]
    TransactionConflict,

    /// An unexpired boost is already running; it is not extended.
    #[error("boost already active until {until}")]
    BoostAlreadyActive { until: DateTime<Utc> },

    /// The account's tier does not carry the boost capability.
    #[error("tier '{tier}' has no boost entitlement")]
    BoostNotEntitled { tier: String },

    /// Provisioning named a tier absent from the configured registry.
    #[error("unknown tier '{tier}'")]
    UnknownTier { tier: String },

    /// Preview updates mutate existing matches only.
    #[error("no match with key '{0}'")]
    MatchNotFound(String),

    /// The caller is not one of the match's two members.
    #[error("not a member of match '{0}'")]
    NotMatchMember(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

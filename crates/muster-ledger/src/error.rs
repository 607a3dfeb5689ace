//! Error types for the ledger.

use crate::gathering::GatheringId;
use crate::proof::ProofId;
use thiserror::Error;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors surfaced by ledger operations.
///
/// Every variant carries a stable numeric [`code`](LedgerError::code) and a
/// symbolic [`name`](LedgerError::symbol). They fall in three classes:
/// authorization (`Unauthorized`), input validation (`InvalidGatheringParams`,
/// `InvalidNetworkTag`) and state conflict (everything else).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Caller is not the administrator.
    #[error("caller is not the ledger administrator")]
    Unauthorized,

    /// The gathering has admitted as many participants as its capacity.
    #[error("gathering {0} is at capacity")]
    CapacityReached(GatheringId),

    /// The caller is already on the gathering's roster.
    #[error("already registered for gathering {0}")]
    DuplicateRegistration(GatheringId),

    /// Claim exceeds the unclaimed balance.
    #[error("insufficient merits: {available} available, {requested} requested")]
    InsufficientMerits { available: u64, requested: u64 },

    /// Crediting or minting the proof token failed; nothing was applied.
    #[error("merit award failed: {0}")]
    MeritAwardFailed(String),

    /// A gathering or partner parameter is out of range.
    #[error("invalid gathering parameters: {0}")]
    InvalidGatheringParams(String),

    /// Reserved for rejecting unregistered partner tags. No operation
    /// returns it: unregistered tags contribute zero bonus instead.
    #[error("partner network not found: {0}")]
    NetworkNotFound(String),

    /// A partner tag is empty or longer than the tag limit.
    #[error("invalid network tag: {0:?}")]
    InvalidNetworkTag(String),

    /// A bounded list is full and the ledger runs with the reject policy.
    #[error("{0} is full")]
    CollectionFull(&'static str),

    /// A record the operation depends on does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl LedgerError {
    /// Stable numeric code.
    pub const fn code(&self) -> u32 {
        match self {
            LedgerError::Unauthorized => 100,
            LedgerError::CapacityReached(_) => 101,
            LedgerError::DuplicateRegistration(_) => 102,
            LedgerError::InsufficientMerits { .. } => 103,
            LedgerError::MeritAwardFailed(_) => 104,
            LedgerError::InvalidGatheringParams(_) => 105,
            LedgerError::NetworkNotFound(_) => 106,
            LedgerError::InvalidNetworkTag(_) => 107,
            LedgerError::CollectionFull(_) => 108,
            LedgerError::NotFound(_) => 404,
        }
    }

    /// Stable symbolic name.
    pub const fn symbol(&self) -> &'static str {
        match self {
            LedgerError::Unauthorized => "Unauthorized",
            LedgerError::CapacityReached(_) => "CapacityReached",
            LedgerError::DuplicateRegistration(_) => "DuplicateRegistration",
            LedgerError::InsufficientMerits { .. } => "InsufficientMerits",
            LedgerError::MeritAwardFailed(_) => "MeritAwardFailed",
            LedgerError::InvalidGatheringParams(_) => "InvalidGatheringParams",
            LedgerError::NetworkNotFound(_) => "NetworkNotFound",
            LedgerError::InvalidNetworkTag(_) => "InvalidNetworkTag",
            LedgerError::CollectionFull(_) => "CollectionFull",
            LedgerError::NotFound(_) => "NotFound",
        }
    }

    pub(crate) fn gathering_not_found(id: GatheringId) -> Self {
        LedgerError::NotFound(format!("gathering {id}"))
    }

    pub(crate) fn proof_not_minted(id: ProofId, reason: impl std::fmt::Display) -> Self {
        LedgerError::MeritAwardFailed(format!("proof {id}: {reason}"))
    }
}

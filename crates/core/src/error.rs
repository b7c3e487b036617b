//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Each variant is a stable error kind reported synchronously to the caller.
/// Validation and state-conflict failures reject before any mutation;
/// infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Authorization failure at the domain boundary (e.g. an approval
    /// identity that does not act for the counterparty company).
    #[error("unauthorized")]
    Unauthorized,

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A part with the given human-facing UID is already registered.
    #[error("part uid '{0}' is already registered")]
    DuplicatePartUid(String),

    /// The referenced part does not exist.
    #[error("part not found")]
    PartNotFound,

    /// The referenced transfer does not exist.
    #[error("transfer not found")]
    TransferNotFound,

    /// The part is not in tradeable custody (installed in an elevator, or
    /// removed and awaiting an explicit return to stock).
    #[error("part is not transferable")]
    PartNotTransferable,

    /// The acting company does not hold custody of the part.
    #[error("company is not the current owner of the part")]
    NotPartOwner,

    /// The part already has an active installation for this elevator.
    #[error("part is already installed in this elevator")]
    PartAlreadyInstalled,

    /// The part already has an outstanding pending transfer.
    #[error("a pending transfer already exists for this part")]
    TransferAlreadyPending,

    /// The transfer is not pending (already approved or rejected).
    #[error("transfer is not pending")]
    TransferNotPending,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn duplicate_part_uid(uid: impl Into<String>) -> Self {
        Self::DuplicatePartUid(uid.into())
    }
}

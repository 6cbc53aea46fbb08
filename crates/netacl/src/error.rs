//! Error types for address parsing and policy tree maintenance.

use thiserror::Error;

use crate::network::AddressFamily;

/// Errors produced by the access list and its building blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AclError {
    /// The literal matches no supported address syntax, or the prefix
    /// length is outside `0..=width` for the family.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A value of one family was used where the other was required.
    #[error("address family mismatch: expected {expected}, found {found}")]
    FamilyMismatch {
        expected: AddressFamily,
        found: AddressFamily,
    },

    /// Sibling nodes overlap. Always a defect in tree maintenance.
    #[error("policy tree inconsistency: {0}")]
    InternalInconsistency(String),

    /// A writer panicked while holding the shared access list lock.
    #[error("access list lock poisoned")]
    LockPoisoned,
}

/// Result type for access list operations.
pub type Result<T> = std::result::Result<T, AclError>;

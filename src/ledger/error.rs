//! Error types for ledger operations.

use thiserror::Error;

use crate::Amount;
use crate::model::UserId;

/// Error returned by the ledger store and the wallet service built on it.
///
/// Every variant is raised before anything is committed, so a failed
/// operation never leaves partial writes behind.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance for user {user}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        user: UserId,
        balance: Amount,
        requested: Amount,
    },

    #[error("invalid amount {0}")]
    InvalidAmount(Amount),

    #[error("invalid pin for user {0}")]
    InvalidPin(UserId),

    #[error("user {0} cannot transfer to themselves")]
    SelfTransfer(UserId),

    #[error("request {0} was already applied")]
    DuplicateRequest(String),

    /// A wallet read inside the atomic scope changed before commit; retry the whole operation.
    #[error("ledger write conflict, retry the operation")]
    Conflict,

    #[error("ledger store unavailable")]
    Unavailable,
}

impl LedgerError {
    /// Whether the caller may retry the whole operation unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Conflict)
    }
}

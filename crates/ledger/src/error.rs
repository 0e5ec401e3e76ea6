//! Error types for ledger operations

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger errors
///
/// Covers the full taxonomy the server maps onto HTTP responses. The pure
/// functions in this crate only produce `Validation`, `InsufficientBalance`
/// and `Overflow`; the storage-facing variants are constructed by the
/// server's query layer so callers handle one error type end to end.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("insufficient balance: have {balance_cents}, need {requested_cents}")]
    InsufficientBalance {
        balance_cents: i64,
        requested_cents: i64,
    },

    #[error("arithmetic overflow in ledger calculation")]
    Overflow,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("concurrent update conflict: {0}")]
    Conflict(String),

    #[error("external provider error: {0}")]
    Provider(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Machine-readable reason string surfaced in failure envelopes.
    pub fn reason(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation_error",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::Overflow => "overflow",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::Provider(_) => "provider_error",
            LedgerError::Storage(_) => "storage_error",
        }
    }
}

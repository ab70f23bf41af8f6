//! The module contains the errors the engine can return.
//!
//! Validation failures (not-found, already-active, insufficient balance) are
//! typed variants the caller branches on; store failures pass through as
//! [`Database`]. [`InvariantViolation`] is never retried and aborts the
//! enclosing database transaction.
//!
//! [`Database`]: EngineError::Database
//! [`InvariantViolation`]: EngineError::InvariantViolation
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Already active: {0}")]
    AlreadyActive(String),
    #[error("Wallet not found for user {0}")]
    WalletNotFound(String),
    #[error("Insufficient wallet balance: {0}")]
    InsufficientBalance(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Stable machine code for the resource layer.
    ///
    /// Callers map these to user-facing messages and HTTP classes: every
    /// variant except `Database` and `InvariantViolation` is
    /// client-correctable.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PaymentMethodNotFound(_) => "payment_method_not_found",
            Self::KeyNotFound(_) => "not_found",
            Self::ExistingKey(_) => "already_exists",
            Self::AlreadyActive(_) => "already_active",
            Self::WalletNotFound(_) => "wallet_not_found",
            Self::InsufficientBalance(_) => "insufficient_balance",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::CurrencyMismatch(_) => "currency_mismatch",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::Database(_) => "store_unavailable",
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::PaymentMethodNotFound(a), Self::PaymentMethodNotFound(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::AlreadyActive(a), Self::AlreadyActive(b)) => a == b,
            (Self::WalletNotFound(a), Self::WalletNotFound(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::InvariantViolation(a), Self::InvariantViolation(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(
            EngineError::InsufficientBalance("u1".to_string()).code(),
            "insufficient_balance"
        );
        assert_eq!(
            EngineError::WalletNotFound("u1".to_string()).code(),
            "wallet_not_found"
        );
        assert_eq!(
            EngineError::Database(DbErr::Custom("boom".to_string())).code(),
            "store_unavailable"
        );
    }
}

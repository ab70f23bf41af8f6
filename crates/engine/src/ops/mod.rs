use sea_orm::DatabaseConnection;

use crate::EngineError;

mod catalog;
mod effects;
mod payments;
mod settle;
mod wallets;

pub use catalog::OrderLine;
pub use settle::{GatewayPaymentCmd, SettleCmd, Settlement};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Attempts for a settlement unit hit by transient store failures.
pub(crate) const MAX_STORE_ATTEMPTS: u32 = 3;

/// Returns `true` for store errors worth a bounded retry (lock contention,
/// pool hiccups). Validation failures and invariant violations are never
/// retried.
pub(crate) fn is_transient(err: &EngineError) -> bool {
    match err {
        EngineError::Database(db_err) => {
            let msg = db_err.to_string().to_ascii_lowercase();
            msg.contains("locked")
                || msg.contains("busy")
                || msg.contains("timed out")
                || msg.contains("connection reset")
                || msg.contains("connection closed")
        }
        _ => false,
    }
}

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            database: self.database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbErr;

    #[test]
    fn transient_classification() {
        assert!(is_transient(&EngineError::Database(DbErr::Custom(
            "database is locked".to_string()
        ))));
        assert!(!is_transient(&EngineError::Database(DbErr::Custom(
            "UNIQUE constraint failed".to_string()
        ))));
        assert!(!is_transient(&EngineError::InsufficientBalance(
            "u1".to_string()
        )));
    }
}

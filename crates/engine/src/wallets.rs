//! The module contains the `Wallet` struct and its implementation.

use chrono::{DateTime, Utc};

use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError, Money};

/// A wallet.
///
/// A wallet is a per-user internal balance usable as a payment method. It is
/// mutated only by the settlement engine and by explicit administrative
/// top-ups; the balance is never allowed to go negative — a debit that would
/// violate this is rejected, not clamped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wallet {
    /// Stable identifier for this wallet.
    ///
    /// This is a UUID generated once and persisted in the database.
    pub id: Uuid,
    /// Owning user. One wallet per user.
    pub user_id: String,
    pub balance: Money,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(user_id: String, currency: Currency, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            balance: Money::ZERO,
            currency,
            created_at,
        }
    }

    /// Returns `true` when the balance covers `amount` in full.
    pub fn can_cover(&self, amount: Money) -> bool {
        self.balance >= amount
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::wallet_histories::Entity")]
    Histories,
}

impl Related<super::wallet_histories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Histories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            balance: ActiveValue::Set(value.balance.minor()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        if model.balance < 0 {
            return Err(EngineError::InvariantViolation(format!(
                "wallet {} has negative balance {}",
                model.id, model.balance
            )));
        }
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("wallet not exists".to_string()))?,
            user_id: model.user_id,
            balance: Money::new(model.balance),
            currency: Currency::try_from(model.currency.as_str())?,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_cover_is_inclusive() {
        let mut wallet = Wallet::new("u1".to_string(), Currency::Usd, Utc::now());
        wallet.balance = Money::new(1000);

        assert!(wallet.can_cover(Money::new(1000)));
        assert!(wallet.can_cover(Money::new(999)));
        assert!(!wallet.can_cover(Money::new(1001)));
    }

    #[test]
    fn negative_stored_balance_is_an_invariant_violation() {
        let model = Model {
            id: Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            balance: -1,
            currency: "USD".to_string(),
            created_at: Utc::now(),
        };

        let err = Wallet::try_from(model).unwrap_err();
        assert_eq!(err.code(), "invariant_violation");
    }
}

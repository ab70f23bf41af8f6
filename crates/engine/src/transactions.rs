//! Transaction primitives.
//!
//! A `Transaction` records the outcome of settling one payable entity: who
//! paid, how much, with which payment method, and whether the payment is
//! still pending, paid, or failed. A payable entity has at most one
//! transaction; partial order payments update the existing row to the
//! cumulative paid amount instead of inserting a second one.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money};

/// Kind of entity a transaction settles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayableKind {
    Order,
    WalletTopup,
    ShopSubscription,
    ShopAdsPackage,
}

impl PayableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::WalletTopup => "wallet_topup",
            Self::ShopSubscription => "shop_subscription",
            Self::ShopAdsPackage => "shop_ads_package",
        }
    }
}

impl TryFrom<&str> for PayableKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "order" => Ok(Self::Order),
            "wallet_topup" => Ok(Self::WalletTopup),
            "shop_subscription" => Ok(Self::ShopSubscription),
            "shop_ads_package" => Ok(Self::ShopAdsPackage),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid payable kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Paid,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for TransactionStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid transaction status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub owner_kind: PayableKind,
    pub owner_id: Uuid,
    /// Paying user.
    pub user_id: String,
    pub amount: Money,
    pub currency: Currency,
    /// Tag of the payment method that settled this transaction.
    pub payment_tag: String,
    /// Reference assigned by an external gateway, when one was involved.
    pub external_ref: Option<String>,
    pub status: TransactionStatus,
    pub note: Option<String>,
    pub performed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_kind: PayableKind,
        owner_id: Uuid,
        user_id: String,
        amount: Money,
        currency: Currency,
        payment_tag: String,
        external_ref: Option<String>,
        status: TransactionStatus,
        note: Option<String>,
        performed_at: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            owner_kind,
            owner_id,
            user_id,
            amount,
            currency,
            payment_tag,
            external_ref,
            status,
            note,
            performed_at,
            created_at: performed_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub owner_kind: String,
    pub owner_id: String,
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
    pub payment_tag: String,
    pub external_ref: Option<String>,
    pub status: String,
    pub note: Option<String>,
    pub performed_at: DateTimeUtc,
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

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            owner_kind: ActiveValue::Set(tx.owner_kind.as_str().to_string()),
            owner_id: ActiveValue::Set(tx.owner_id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            amount: ActiveValue::Set(tx.amount.minor()),
            currency: ActiveValue::Set(tx.currency.code().to_string()),
            payment_tag: ActiveValue::Set(tx.payment_tag.clone()),
            external_ref: ActiveValue::Set(tx.external_ref.clone()),
            status: ActiveValue::Set(tx.status.as_str().to_string()),
            note: ActiveValue::Set(tx.note.clone()),
            performed_at: ActiveValue::Set(tx.performed_at),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            owner_kind: PayableKind::try_from(model.owner_kind.as_str())?,
            owner_id: Uuid::parse_str(&model.owner_id)
                .map_err(|_| EngineError::KeyNotFound("payable entity not exists".to_string()))?,
            user_id: model.user_id,
            amount: Money::new(model.amount),
            currency: Currency::try_from(model.currency.as_str())?,
            payment_tag: model.payment_tag,
            external_ref: model.external_ref,
            status: TransactionStatus::try_from(model.status.as_str())?,
            note: model.note,
            performed_at: model.performed_at,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_amounts() {
        let err = Transaction::new(
            PayableKind::Order,
            Uuid::new_v4(),
            "u1".to_string(),
            Money::ZERO,
            Currency::Usd,
            "wallet".to_string(),
            None,
            TransactionStatus::Paid,
            None,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, EngineError::InvalidAmount("amount must be > 0".to_string()));
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            PayableKind::Order,
            PayableKind::WalletTopup,
            PayableKind::ShopSubscription,
            PayableKind::ShopAdsPackage,
        ] {
            assert_eq!(PayableKind::try_from(kind.as_str()).unwrap(), kind);
        }
    }
}

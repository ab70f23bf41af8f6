//! Wallet history entries.
//!
//! A [`WalletHistoryEntry`] is a single movement of wallet money, recorded
//! once per successful settlement that touched the balance. Entries are
//! append-only: the settlement path never mutates or deletes them.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, transactions::TransactionStatus};

/// Direction of a wallet movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryDirection {
    /// Balance addition (top-up, refund).
    Topup,
    /// Balance deduction (purchase).
    Withdraw,
}

impl HistoryDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Topup => "topup",
            Self::Withdraw => "withdraw",
        }
    }
}

impl TryFrom<&str> for HistoryDirection {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "topup" => Ok(Self::Topup),
            "withdraw" => Ok(Self::Withdraw),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid history direction: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletHistoryEntry {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub transaction_id: Uuid,
    pub direction: HistoryDirection,
    pub amount: Money,
    pub note: Option<String>,
    pub status: TransactionStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl WalletHistoryEntry {
    pub fn new(
        wallet_id: Uuid,
        transaction_id: Uuid,
        direction: HistoryDirection,
        amount: Money,
        note: Option<String>,
        created_by: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id,
            transaction_id,
            direction,
            amount,
            note,
            status: TransactionStatus::Paid,
            created_by,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallet_histories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub wallet_id: String,
    pub transaction_id: String,
    pub direction: String,
    pub amount: i64,
    pub note: Option<String>,
    pub status: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wallets,
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Transactions,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&WalletHistoryEntry> for ActiveModel {
    fn from(entry: &WalletHistoryEntry) -> Self {
        Self {
            id: ActiveValue::Set(entry.id.to_string()),
            wallet_id: ActiveValue::Set(entry.wallet_id.to_string()),
            transaction_id: ActiveValue::Set(entry.transaction_id.to_string()),
            direction: ActiveValue::Set(entry.direction.as_str().to_string()),
            amount: ActiveValue::Set(entry.amount.minor()),
            note: ActiveValue::Set(entry.note.clone()),
            status: ActiveValue::Set(entry.status.as_str().to_string()),
            created_by: ActiveValue::Set(entry.created_by.clone()),
            created_at: ActiveValue::Set(entry.created_at),
        }
    }
}

impl TryFrom<Model> for WalletHistoryEntry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("history entry not exists".to_string()))?,
            wallet_id: Uuid::parse_str(&model.wallet_id)
                .map_err(|_| EngineError::KeyNotFound("wallet not exists".to_string()))?,
            transaction_id: Uuid::parse_str(&model.transaction_id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            direction: HistoryDirection::try_from(model.direction.as_str())?,
            amount: Money::new(model.amount),
            note: model.note,
            status: TransactionStatus::try_from(model.status.as_str())?,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}

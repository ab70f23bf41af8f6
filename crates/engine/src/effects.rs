//! Post-settlement effects outbox.
//!
//! Activation and digital-file unlocking must survive a crash between the
//! wallet debit and the side effect. Instead of firing them in-band, the
//! settlement writes one [`SettlementEffect`] row per effect inside the same
//! database transaction as the debit; a worker drains pending rows and
//! applies each one idempotently.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

/// A durable side-effect descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectKind {
    ActivateSubscription { subscription_id: Uuid },
    ActivateAdsPackage { shop_ads_package_id: Uuid },
    UnlockDigitalFiles { order_id: Uuid },
}

impl EffectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActivateSubscription { .. } => "activate_subscription",
            Self::ActivateAdsPackage { .. } => "activate_ads_package",
            Self::UnlockDigitalFiles { .. } => "unlock_digital_files",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectStatus {
    Pending,
    Done,
    Failed,
}

impl EffectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for EffectStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::InvalidAmount(format!(
                "invalid effect status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementEffect {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub effect: EffectKind,
    pub status: EffectStatus,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SettlementEffect {
    pub fn new(transaction_id: Uuid, effect: EffectKind, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_id,
            effect,
            status: EffectStatus::Pending,
            attempts: 0,
            created_at,
            completed_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlement_effects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub transaction_id: String,
    pub kind: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub created_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&SettlementEffect> for ActiveModel {
    type Error = EngineError;

    fn try_from(effect: &SettlementEffect) -> Result<Self, Self::Error> {
        let payload = serde_json::to_string(&effect.effect).map_err(|err| {
            EngineError::InvariantViolation(format!("unserializable effect: {err}"))
        })?;
        Ok(Self {
            id: ActiveValue::Set(effect.id.to_string()),
            transaction_id: ActiveValue::Set(effect.transaction_id.to_string()),
            kind: ActiveValue::Set(effect.effect.as_str().to_string()),
            payload: ActiveValue::Set(payload),
            status: ActiveValue::Set(effect.status.as_str().to_string()),
            attempts: ActiveValue::Set(effect.attempts),
            created_at: ActiveValue::Set(effect.created_at),
            completed_at: ActiveValue::Set(effect.completed_at),
        })
    }
}

impl TryFrom<Model> for SettlementEffect {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let effect: EffectKind = serde_json::from_str(&model.payload).map_err(|err| {
            EngineError::InvariantViolation(format!(
                "corrupt effect payload for {}: {err}",
                model.id
            ))
        })?;
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("effect not exists".to_string()))?,
            transaction_id: Uuid::parse_str(&model.transaction_id)
                .map_err(|_| EngineError::KeyNotFound("transaction not exists".to_string()))?,
            effect,
            status: EffectStatus::try_from(model.status.as_str())?,
            attempts: model.attempts,
            created_at: model.created_at,
            completed_at: model.completed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_round_trips() {
        let order_id = Uuid::new_v4();
        let effect = SettlementEffect::new(
            Uuid::new_v4(),
            EffectKind::UnlockDigitalFiles { order_id },
            Utc::now(),
        );

        let active = ActiveModel::try_from(&effect).unwrap();
        let payload = match active.payload {
            ActiveValue::Set(ref payload) => payload.clone(),
            _ => unreachable!(),
        };
        let parsed: EffectKind = serde_json::from_str(&payload).unwrap();
        assert_eq!(parsed, EffectKind::UnlockDigitalFiles { order_id });
    }

    #[test]
    fn kind_labels() {
        let kind = EffectKind::ActivateSubscription {
            subscription_id: Uuid::new_v4(),
        };
        assert_eq!(kind.as_str(), "activate_subscription");
    }
}

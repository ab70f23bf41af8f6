//! Shop subscriptions.
//!
//! A subscription is purchased by a seller for their shop. Settlement is
//! rejected with `AlreadyActive` once the active flag is set; activation
//! itself happens through the effects outbox after a successful payment.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, entity::prelude::*, entity::ActiveValue};
use uuid::Uuid;

use crate::{
    Currency, EffectKind, EngineError, Money, ResultEngine, Transaction,
    payable::Payable,
    transactions::PayableKind,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShopSubscription {
    pub id: Uuid,
    pub shop_id: Uuid,
    /// Purchasing user (the shop's seller).
    pub user_id: String,
    pub price: Money,
    pub currency: Currency,
    pub active: bool,
    pub expired_at: Option<DateTime<Utc>>,
}

impl Payable for ShopSubscription {
    fn kind(&self) -> PayableKind {
        PayableKind::ShopSubscription
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn payer_user_id(&self) -> &str {
        &self.user_id
    }

    fn currency(&self) -> Currency {
        self.currency
    }

    fn post_settlement_effects(&self) -> Vec<EffectKind> {
        vec![EffectKind::ActivateSubscription {
            subscription_id: self.id,
        }]
    }

    async fn ensure_settleable(&self, db_tx: &DatabaseTransaction) -> ResultEngine<()> {
        let model = Entity::find_by_id(self.id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("subscription not exists".to_string()))?;
        if model.active {
            return Err(EngineError::AlreadyActive(format!(
                "subscription #{}",
                self.id
            )));
        }
        Ok(())
    }

    /// Fixed catalog price, re-read from the live row.
    async fn charge_amount(
        &self,
        db_tx: &DatabaseTransaction,
        _existing: Option<&Transaction>,
    ) -> ResultEngine<Money> {
        let model = Entity::find_by_id(self.id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("subscription not exists".to_string()))?;
        Ok(Money::new(model.price))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shop_subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub shop_id: String,
    pub user_id: String,
    pub price: i64,
    pub currency: String,
    pub active: bool,
    pub expired_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ShopSubscription> for ActiveModel {
    fn from(sub: &ShopSubscription) -> Self {
        Self {
            id: ActiveValue::Set(sub.id.to_string()),
            shop_id: ActiveValue::Set(sub.shop_id.to_string()),
            user_id: ActiveValue::Set(sub.user_id.clone()),
            price: ActiveValue::Set(sub.price.minor()),
            currency: ActiveValue::Set(sub.currency.code().to_string()),
            active: ActiveValue::Set(sub.active),
            expired_at: ActiveValue::Set(sub.expired_at),
        }
    }
}

impl TryFrom<Model> for ShopSubscription {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("subscription not exists".to_string()))?,
            shop_id: Uuid::parse_str(&model.shop_id)
                .map_err(|_| EngineError::KeyNotFound("shop not exists".to_string()))?,
            user_id: model.user_id,
            price: Money::new(model.price),
            currency: Currency::try_from(model.currency.as_str())?,
            active: model.active,
            expired_at: model.expired_at,
        })
    }
}

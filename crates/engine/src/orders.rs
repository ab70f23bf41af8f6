//! Orders.
//!
//! An order is created by the checkout flow before settlement is ever
//! invoked; the engine only reads it and charges the difference between its
//! live total and what was already paid. Orders have no activation step —
//! a successful wallet payment instead unlocks the digital files attached to
//! their line items (see the effects outbox).

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseTransaction, entity::prelude::*, entity::ActiveValue};
use uuid::Uuid;

use crate::{
    Currency, EffectKind, EngineError, Money, ResultEngine, Transaction,
    payable::Payable,
    transactions::{PayableKind, TransactionStatus},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub total_price: Money,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Payable for Order {
    fn kind(&self) -> PayableKind {
        PayableKind::Order
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
        vec![EffectKind::UnlockDigitalFiles { order_id: self.id }]
    }

    fn supports_partial_settlement(&self) -> bool {
        true
    }

    /// Amount still due: the live order total minus what the existing paid
    /// transaction already recorded.
    ///
    /// The total is re-read inside the settlement transaction because the
    /// order may have been edited (items added, delivery changed) after a
    /// first payment; the delta is what gets charged.
    async fn charge_amount(
        &self,
        db_tx: &DatabaseTransaction,
        existing: Option<&Transaction>,
    ) -> ResultEngine<Money> {
        let model = Entity::find_by_id(self.id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("order not exists".to_string()))?;

        let total = Money::new(model.total_price);
        let paid = existing
            .filter(|tx| tx.status == TransactionStatus::Paid)
            .map(|tx| tx.amount)
            .unwrap_or(Money::ZERO);

        Ok(total - paid)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub total_price: i64,
    pub currency: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_details::Entity")]
    Details,
}

impl Related<super::order_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Details.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Order> for ActiveModel {
    fn from(order: &Order) -> Self {
        Self {
            id: ActiveValue::Set(order.id.to_string()),
            user_id: ActiveValue::Set(order.user_id.clone()),
            total_price: ActiveValue::Set(order.total_price.minor()),
            currency: ActiveValue::Set(order.currency.code().to_string()),
            created_at: ActiveValue::Set(order.created_at),
        }
    }
}

impl TryFrom<Model> for Order {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("order not exists".to_string()))?,
            user_id: model.user_id,
            total_price: Money::new(model.total_price),
            currency: Currency::try_from(model.currency.as_str())?,
            created_at: model.created_at,
        })
    }
}

//! Order line items.

use sea_orm::{entity::prelude::*, entity::ActiveValue};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

/// A single order line: a stock reference and a quantity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderDetail {
    pub id: Uuid,
    pub order_id: Uuid,
    pub stock_id: Uuid,
    pub quantity: i32,
    /// Line total.
    pub price: Money,
}

impl OrderDetail {
    pub fn new(order_id: Uuid, stock_id: Uuid, quantity: i32, price: Money) -> ResultEngine<Self> {
        if quantity <= 0 {
            return Err(EngineError::InvalidAmount(
                "quantity must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            order_id,
            stock_id,
            quantity,
            price,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "order_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub stock_id: String,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::orders::Entity",
        from = "Column::OrderId",
        to = "super::orders::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Orders,
    #[sea_orm(
        belongs_to = "super::stocks::Entity",
        from = "Column::StockId",
        to = "super::stocks::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Stocks,
}

impl Related<super::orders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::stocks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stocks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&OrderDetail> for ActiveModel {
    fn from(detail: &OrderDetail) -> Self {
        Self {
            id: ActiveValue::Set(detail.id.to_string()),
            order_id: ActiveValue::Set(detail.order_id.to_string()),
            stock_id: ActiveValue::Set(detail.stock_id.to_string()),
            quantity: ActiveValue::Set(detail.quantity),
            price: ActiveValue::Set(detail.price.minor()),
        }
    }
}

impl TryFrom<Model> for OrderDetail {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("order detail not exists".to_string()))?,
            order_id: Uuid::parse_str(&model.order_id)
                .map_err(|_| EngineError::KeyNotFound("order not exists".to_string()))?,
            stock_id: Uuid::parse_str(&model.stock_id)
                .map_err(|_| EngineError::KeyNotFound("stock not exists".to_string()))?,
            quantity: model.quantity,
            price: Money::new(model.price),
        })
    }
}

//! Ads package catalog.

use sea_orm::{entity::prelude::*, entity::ActiveValue};
use uuid::Uuid;

use crate::{EngineError, Money};

/// A purchasable advertisement package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdsPackage {
    pub id: Uuid,
    pub price: Money,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ads_packages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub price: i64,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shop_ads_packages::Entity")]
    ShopPackages,
}

impl Related<super::shop_ads_packages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShopPackages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&AdsPackage> for ActiveModel {
    fn from(package: &AdsPackage) -> Self {
        Self {
            id: ActiveValue::Set(package.id.to_string()),
            price: ActiveValue::Set(package.price.minor()),
            active: ActiveValue::Set(package.active),
        }
    }
}

impl TryFrom<Model> for AdsPackage {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("ads package not exists".to_string()))?,
            price: Money::new(model.price),
            active: model.active,
        })
    }
}

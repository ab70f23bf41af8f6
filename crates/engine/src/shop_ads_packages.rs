//! Ads packages purchased by shops.
//!
//! The purchase row references the catalog package that holds the price.
//! Like subscriptions, a purchase already marked active cannot be settled
//! again.

use sea_orm::{DatabaseTransaction, QueryFilter, entity::prelude::*, entity::ActiveValue};
use uuid::Uuid;

use crate::{
    Currency, EffectKind, EngineError, Money, ResultEngine, Transaction, ads_packages,
    payable::Payable,
    transactions::PayableKind,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShopAdsPackage {
    pub id: Uuid,
    pub ads_package_id: Uuid,
    pub shop_id: Uuid,
    /// Purchasing user (the shop's seller).
    pub user_id: String,
    pub currency: Currency,
    pub active: bool,
}

impl Payable for ShopAdsPackage {
    fn kind(&self) -> PayableKind {
        PayableKind::ShopAdsPackage
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
        vec![EffectKind::ActivateAdsPackage {
            shop_ads_package_id: self.id,
        }]
    }

    async fn ensure_settleable(&self, db_tx: &DatabaseTransaction) -> ResultEngine<()> {
        let model = Entity::find_by_id(self.id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("ads purchase not exists".to_string()))?;
        if model.active {
            return Err(EngineError::AlreadyActive(format!("ads #{}", self.id)));
        }
        Ok(())
    }

    /// Price of the referenced catalog package.
    async fn charge_amount(
        &self,
        db_tx: &DatabaseTransaction,
        _existing: Option<&Transaction>,
    ) -> ResultEngine<Money> {
        let package = ads_packages::Entity::find_by_id(self.ads_package_id.to_string())
            .filter(ads_packages::Column::Active.eq(true))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("ads package not exists".to_string()))?;
        Ok(Money::new(package.price))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shop_ads_packages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub ads_package_id: String,
    pub shop_id: String,
    pub user_id: String,
    pub currency: String,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ads_packages::Entity",
        from = "Column::AdsPackageId",
        to = "super::ads_packages::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    AdsPackages,
}

impl Related<super::ads_packages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AdsPackages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ShopAdsPackage> for ActiveModel {
    fn from(purchase: &ShopAdsPackage) -> Self {
        Self {
            id: ActiveValue::Set(purchase.id.to_string()),
            ads_package_id: ActiveValue::Set(purchase.ads_package_id.to_string()),
            shop_id: ActiveValue::Set(purchase.shop_id.to_string()),
            user_id: ActiveValue::Set(purchase.user_id.clone()),
            currency: ActiveValue::Set(purchase.currency.code().to_string()),
            active: ActiveValue::Set(purchase.active),
        }
    }
}

impl TryFrom<Model> for ShopAdsPackage {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::KeyNotFound("ads purchase not exists".to_string()))?,
            ads_package_id: Uuid::parse_str(&model.ads_package_id)
                .map_err(|_| EngineError::KeyNotFound("ads package not exists".to_string()))?,
            shop_id: Uuid::parse_str(&model.shop_id)
                .map_err(|_| EngineError::KeyNotFound("shop not exists".to_string()))?,
            user_id: model.user_id,
            currency: Currency::try_from(model.currency.as_str())?,
            active: model.active,
        })
    }
}

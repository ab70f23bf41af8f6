//! Catalog-side operations.
//!
//! Orders, subscriptions and ads purchases are created by their own domain
//! flows before settlement ever runs; the engine carries just enough of
//! those flows to persist the entities it settles, plus the finders the
//! resource layer uses.

use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Money, ResultEngine, Transaction,
    ads_packages::{self, AdsPackage},
    digital_files, order_details,
    order_details::OrderDetail,
    orders::{self, Order},
    shop_ads_packages::{self, ShopAdsPackage},
    shop_subscriptions::{self, ShopSubscription},
    stocks,
    transactions::{self, PayableKind},
    user_digital_files,
};

use super::{Engine, with_tx};

/// One order line as submitted by checkout.
#[derive(Clone, Debug)]
pub struct OrderLine {
    pub stock_id: Uuid,
    pub quantity: i32,
    /// Line total.
    pub price: Money,
}

impl Engine {
    /// Persists an order with its line items. The total is the sum of the
    /// line totals.
    pub async fn create_order(
        &self,
        user_id: &str,
        currency: Currency,
        lines: Vec<OrderLine>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Order> {
        if lines.is_empty() {
            return Err(EngineError::InvalidAmount(
                "order must have at least one line".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let mut total = Money::ZERO;
            for line in &lines {
                stocks::Entity::find_by_id(line.stock_id.to_string())
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| EngineError::KeyNotFound("stock not exists".to_string()))?;
                total = total
                    .checked_add(line.price)
                    .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
            }

            let order = Order {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                total_price: total,
                currency,
                created_at,
            };
            orders::ActiveModel::from(&order).insert(&db_tx).await?;

            for line in &lines {
                let detail =
                    OrderDetail::new(order.id, line.stock_id, line.quantity, line.price)?;
                order_details::ActiveModel::from(&detail)
                    .insert(&db_tx)
                    .await?;
            }

            Ok(order)
        })
    }

    pub async fn order(&self, order_id: Uuid) -> ResultEngine<Order> {
        let model = orders::Entity::find_by_id(order_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("order not exists".to_string()))?;
        Order::try_from(model)
    }

    pub async fn create_stock(&self, product_id: Uuid) -> ResultEngine<Uuid> {
        let id = Uuid::new_v4();
        let model = stocks::ActiveModel {
            id: sea_orm::ActiveValue::Set(id.to_string()),
            product_id: sea_orm::ActiveValue::Set(product_id.to_string()),
            sold_count: sea_orm::ActiveValue::Set(0),
        };
        model.insert(&self.database).await?;
        Ok(id)
    }

    pub async fn create_digital_file(&self, product_id: Uuid, active: bool) -> ResultEngine<Uuid> {
        let id = Uuid::new_v4();
        let model = digital_files::ActiveModel {
            id: sea_orm::ActiveValue::Set(id.to_string()),
            product_id: sea_orm::ActiveValue::Set(product_id.to_string()),
            active: sea_orm::ActiveValue::Set(active),
        };
        model.insert(&self.database).await?;
        Ok(id)
    }

    pub async fn create_subscription(
        &self,
        shop_id: Uuid,
        user_id: &str,
        price: Money,
        currency: Currency,
    ) -> ResultEngine<ShopSubscription> {
        if !price.is_positive() {
            return Err(EngineError::InvalidAmount(
                "subscription price must be > 0".to_string(),
            ));
        }
        let subscription = ShopSubscription {
            id: Uuid::new_v4(),
            shop_id,
            user_id: user_id.to_string(),
            price,
            currency,
            active: false,
            expired_at: None,
        };
        shop_subscriptions::ActiveModel::from(&subscription)
            .insert(&self.database)
            .await?;
        Ok(subscription)
    }

    pub async fn subscription(&self, subscription_id: Uuid) -> ResultEngine<ShopSubscription> {
        let model = shop_subscriptions::Entity::find_by_id(subscription_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("subscription not exists".to_string()))?;
        ShopSubscription::try_from(model)
    }

    pub async fn create_ads_package(&self, price: Money) -> ResultEngine<AdsPackage> {
        if !price.is_positive() {
            return Err(EngineError::InvalidAmount(
                "ads package price must be > 0".to_string(),
            ));
        }
        let package = AdsPackage {
            id: Uuid::new_v4(),
            price,
            active: true,
        };
        ads_packages::ActiveModel::from(&package)
            .insert(&self.database)
            .await?;
        Ok(package)
    }

    /// Records a shop's purchase of an ads package, inactive until settled.
    pub async fn purchase_ads_package(
        &self,
        ads_package_id: Uuid,
        shop_id: Uuid,
        user_id: &str,
        currency: Currency,
    ) -> ResultEngine<ShopAdsPackage> {
        with_tx!(self, |db_tx| {
            ads_packages::Entity::find_by_id(ads_package_id.to_string())
                .filter(ads_packages::Column::Active.eq(true))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("ads package not exists".to_string()))?;

            let purchase = ShopAdsPackage {
                id: Uuid::new_v4(),
                ads_package_id,
                shop_id,
                user_id: user_id.to_string(),
                currency,
                active: false,
            };
            shop_ads_packages::ActiveModel::from(&purchase)
                .insert(&db_tx)
                .await?;
            Ok(purchase)
        })
    }

    pub async fn shop_ads_package(&self, id: Uuid) -> ResultEngine<ShopAdsPackage> {
        let model = shop_ads_packages::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("ads purchase not exists".to_string()))?;
        ShopAdsPackage::try_from(model)
    }

    /// The transaction recorded for a payable entity, if any.
    pub async fn transaction_for(
        &self,
        kind: PayableKind,
        owner_id: Uuid,
    ) -> ResultEngine<Option<Transaction>> {
        let model = transactions::Entity::find()
            .filter(transactions::Column::OwnerKind.eq(kind.as_str()))
            .filter(transactions::Column::OwnerId.eq(owner_id.to_string()))
            .one(&self.database)
            .await?;
        model.map(Transaction::try_from).transpose()
    }

    /// Digital files a user has active access to.
    pub async fn digital_file_grants(&self, user_id: &str) -> ResultEngine<Vec<Uuid>> {
        let models = user_digital_files::Entity::find()
            .filter(user_digital_files::Column::UserId.eq(user_id))
            .filter(user_digital_files::Column::Active.eq(true))
            .all(&self.database)
            .await?;

        let mut grants = Vec::with_capacity(models.len());
        for model in models {
            let id = Uuid::parse_str(&model.digital_file_id)
                .map_err(|_| EngineError::KeyNotFound("digital file not exists".to_string()))?;
            grants.push(id);
        }
        Ok(grants)
    }

    pub async fn stock_sold_count(&self, stock_id: Uuid) -> ResultEngine<i64> {
        let model = stocks::Entity::find_by_id(stock_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("stock not exists".to_string()))?;
        Ok(model.sold_count)
    }
}

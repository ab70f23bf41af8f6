//! Effects outbox drain.
//!
//! Pending effect rows are applied one at a time, each inside its own
//! database transaction together with its `done` flip — replaying after a
//! crash can therefore never double-apply an effect. A failed application
//! bumps the attempt counter and is retried on the next drain until the
//! attempt budget is exhausted.

use std::time::Duration;

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, digital_files,
    effects::{self, EffectKind, EffectStatus, SettlementEffect},
    order_details, orders, shop_ads_packages, shop_subscriptions, stocks, user_digital_files,
};

use super::{Engine, with_tx};

const EFFECT_BATCH: u64 = 32;
const MAX_EFFECT_ATTEMPTS: i32 = 5;

impl Engine {
    /// Applies up to `limit` pending effects, oldest first.
    ///
    /// Returns how many were applied. Individual failures are recorded on
    /// the effect row and do not abort the drain.
    pub async fn drain_pending_effects(&self, limit: u64) -> ResultEngine<usize> {
        let models = effects::Entity::find()
            .filter(effects::Column::Status.eq(EffectStatus::Pending.as_str()))
            .order_by_asc(effects::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?;

        self.drain_models(models).await
    }

    /// Applies the pending effects of a single transaction (inline drain
    /// right after settlement).
    pub async fn drain_effects_for_transaction(
        &self,
        transaction_id: Uuid,
    ) -> ResultEngine<usize> {
        let models = effects::Entity::find()
            .filter(effects::Column::Status.eq(EffectStatus::Pending.as_str()))
            .filter(effects::Column::TransactionId.eq(transaction_id.to_string()))
            .order_by_asc(effects::Column::CreatedAt)
            .all(&self.database)
            .await?;

        self.drain_models(models).await
    }

    /// Periodic reconciliation loop for the app binary.
    pub async fn run_effects_worker(&self, poll_interval: Duration) {
        let mut interval = tokio::time::interval(poll_interval);
        loop {
            interval.tick().await;
            match self.drain_pending_effects(EFFECT_BATCH).await {
                Ok(0) => {}
                Ok(applied) => tracing::info!(applied, "applied settlement effects"),
                Err(err) => tracing::error!("effects drain failed: {err}"),
            }
        }
    }

    async fn drain_models(&self, models: Vec<effects::Model>) -> ResultEngine<usize> {
        let mut applied = 0;
        for model in models {
            let effect = match SettlementEffect::try_from(model) {
                Ok(effect) => effect,
                Err(err) => {
                    tracing::error!("skipping corrupt effect row: {err}");
                    continue;
                }
            };

            match self.apply_effect_record(&effect).await {
                Ok(true) => applied += 1,
                Ok(false) => {}
                Err(err) => {
                    tracing::warn!(
                        effect_id = %effect.id,
                        kind = effect.effect.as_str(),
                        error = %err,
                        "effect application failed"
                    );
                    self.record_effect_failure(&effect).await?;
                }
            }
        }
        Ok(applied)
    }

    /// Applies one effect and flips it to `done` in the same transaction.
    ///
    /// Returns `false` when another drainer already claimed the row.
    async fn apply_effect_record(&self, effect: &SettlementEffect) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let Some(current) = effects::Entity::find_by_id(effect.id.to_string())
                .one(&db_tx)
                .await?
            else {
                return Ok(false);
            };
            if EffectStatus::try_from(current.status.as_str())? != EffectStatus::Pending {
                return Ok(false);
            }

            self.apply_effect(&db_tx, &effect.effect).await?;

            let done = effects::ActiveModel {
                id: ActiveValue::Set(effect.id.to_string()),
                status: ActiveValue::Set(EffectStatus::Done.as_str().to_string()),
                attempts: ActiveValue::Set(current.attempts + 1),
                completed_at: ActiveValue::Set(Some(Utc::now())),
                ..Default::default()
            };
            done.update(&db_tx).await?;
            Ok(true)
        })
    }

    async fn record_effect_failure(&self, effect: &SettlementEffect) -> ResultEngine<()> {
        let result: ResultEngine<()> = with_tx!(self, |db_tx| {
            let Some(current) = effects::Entity::find_by_id(effect.id.to_string())
                .one(&db_tx)
                .await?
            else {
                return Ok(());
            };

            let attempts = current.attempts + 1;
            let status = if attempts >= MAX_EFFECT_ATTEMPTS {
                EffectStatus::Failed
            } else {
                EffectStatus::Pending
            };
            if status == EffectStatus::Failed {
                tracing::error!(
                    effect_id = %effect.id,
                    kind = effect.effect.as_str(),
                    attempts,
                    "effect exhausted its attempt budget"
                );
            }

            let update = effects::ActiveModel {
                id: ActiveValue::Set(effect.id.to_string()),
                status: ActiveValue::Set(status.as_str().to_string()),
                attempts: ActiveValue::Set(attempts),
                ..Default::default()
            };
            update.update(&db_tx).await?;
            Ok(())
        });
        result
    }

    async fn apply_effect(
        &self,
        db_tx: &DatabaseTransaction,
        effect: &EffectKind,
    ) -> ResultEngine<()> {
        match effect {
            EffectKind::ActivateSubscription { subscription_id } => {
                let model = shop_subscriptions::Entity::find_by_id(subscription_id.to_string())
                    .one(db_tx)
                    .await?
                    .ok_or_else(|| {
                        EngineError::KeyNotFound("subscription not exists".to_string())
                    })?;
                if !model.active {
                    let update = shop_subscriptions::ActiveModel {
                        id: ActiveValue::Set(model.id),
                        active: ActiveValue::Set(true),
                        ..Default::default()
                    };
                    update.update(db_tx).await?;
                }
                Ok(())
            }
            EffectKind::ActivateAdsPackage {
                shop_ads_package_id,
            } => {
                let model = shop_ads_packages::Entity::find_by_id(shop_ads_package_id.to_string())
                    .one(db_tx)
                    .await?
                    .ok_or_else(|| {
                        EngineError::KeyNotFound("ads purchase not exists".to_string())
                    })?;
                if !model.active {
                    let update = shop_ads_packages::ActiveModel {
                        id: ActiveValue::Set(model.id),
                        active: ActiveValue::Set(true),
                        ..Default::default()
                    };
                    update.update(db_tx).await?;
                }
                Ok(())
            }
            EffectKind::UnlockDigitalFiles { order_id } => {
                self.unlock_digital_files(db_tx, *order_id).await
            }
        }
    }

    /// Grants the buyer access to every active digital file in the order and
    /// bumps the matching stock sale counters.
    async fn unlock_digital_files(
        &self,
        db_tx: &DatabaseTransaction,
        order_id: Uuid,
    ) -> ResultEngine<()> {
        let order = orders::Entity::find_by_id(order_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("order not exists".to_string()))?;

        let details = order_details::Entity::find()
            .filter(order_details::Column::OrderId.eq(order_id.to_string()))
            .all(db_tx)
            .await?;

        for detail in details {
            let Some(stock) = stocks::Entity::find_by_id(detail.stock_id.clone())
                .one(db_tx)
                .await?
            else {
                continue;
            };
            let Some(file) = digital_files::Entity::find()
                .filter(digital_files::Column::ProductId.eq(stock.product_id.clone()))
                .filter(digital_files::Column::Active.eq(true))
                .one(db_tx)
                .await?
            else {
                continue;
            };

            let grant = user_digital_files::Entity::find()
                .filter(user_digital_files::Column::DigitalFileId.eq(file.id.clone()))
                .filter(user_digital_files::Column::UserId.eq(order.user_id.clone()))
                .one(db_tx)
                .await?;

            match grant {
                Some(existing) if !existing.active => {
                    let update = user_digital_files::ActiveModel {
                        id: ActiveValue::Set(existing.id),
                        active: ActiveValue::Set(true),
                        ..Default::default()
                    };
                    update.update(db_tx).await?;
                }
                Some(_) => {}
                None => {
                    let insert = user_digital_files::ActiveModel {
                        id: ActiveValue::Set(Uuid::new_v4().to_string()),
                        digital_file_id: ActiveValue::Set(file.id.clone()),
                        user_id: ActiveValue::Set(order.user_id.clone()),
                        active: ActiveValue::Set(true),
                    };
                    insert.insert(db_tx).await?;
                }
            }

            let stock_update = stocks::ActiveModel {
                id: ActiveValue::Set(stock.id.clone()),
                sold_count: ActiveValue::Set(stock.sold_count + i64::from(detail.quantity)),
                ..Default::default()
            };
            stock_update.update(db_tx).await?;
        }

        Ok(())
    }
}

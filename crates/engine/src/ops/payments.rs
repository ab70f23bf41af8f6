//! Payment method registry operations.

use sea_orm::{ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    payments::{self, DEFAULT_METHODS, PaymentMethod},
};

use super::{Engine, with_tx};

impl Engine {
    /// Seeds the registry with the default method catalog.
    ///
    /// Existing rows keep their id and active flag; only the UI position is
    /// refreshed and missing tags are inserted. Safe to run on every boot.
    pub async fn seed_payment_methods(&self) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            for (index, tag) in DEFAULT_METHODS.iter().enumerate() {
                let position = (index + 1) as i32;
                let existing = payments::Entity::find()
                    .filter(payments::Column::Tag.eq(*tag))
                    .one(&db_tx)
                    .await?;

                match existing {
                    Some(model) if model.position != position => {
                        let active = payments::ActiveModel {
                            id: ActiveValue::Set(model.id),
                            position: ActiveValue::Set(position),
                            ..Default::default()
                        };
                        active.update(&db_tx).await?;
                    }
                    Some(_) => {}
                    None => {
                        let method = PaymentMethod {
                            id: Uuid::new_v4(),
                            tag: payments::PaymentTag::from(*tag),
                            active: true,
                            position,
                        };
                        payments::ActiveModel::from(&method).insert(&db_tx).await?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Lists the registry in UI order.
    pub async fn payment_methods(&self) -> ResultEngine<Vec<PaymentMethod>> {
        let models = payments::Entity::find()
            .order_by_asc(payments::Column::Position)
            .all(&self.database)
            .await?;
        models.into_iter().map(PaymentMethod::try_from).collect()
    }

    /// Returns the method registered under `tag`.
    pub async fn payment_method_by_tag(&self, tag: &str) -> ResultEngine<PaymentMethod> {
        let model = payments::Entity::find()
            .filter(payments::Column::Tag.eq(tag))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::PaymentMethodNotFound(tag.to_string()))?;
        PaymentMethod::try_from(model)
    }

    /// Enables or disables a payment method.
    pub async fn set_payment_method_active(&self, tag: &str, active: bool) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = payments::Entity::find()
                .filter(payments::Column::Tag.eq(tag))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::PaymentMethodNotFound(tag.to_string()))?;

            let update = payments::ActiveModel {
                id: ActiveValue::Set(model.id),
                active: ActiveValue::Set(active),
                ..Default::default()
            };
            update.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Resolves a method id inside a settlement transaction.
    ///
    /// Inactive methods are indistinguishable from missing ones on purpose:
    /// a disabled gateway must not accept new settlements.
    pub(super) async fn require_payment_method(
        &self,
        db_tx: &DatabaseTransaction,
        payment_id: Uuid,
    ) -> ResultEngine<PaymentMethod> {
        let model = payments::Entity::find_by_id(payment_id.to_string())
            .filter(payments::Column::Active.eq(true))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::PaymentMethodNotFound(payment_id.to_string()))?;
        PaymentMethod::try_from(model)
    }
}

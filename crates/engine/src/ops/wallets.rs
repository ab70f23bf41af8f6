//! Wallet operations.

use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Currency, EngineError, Money, ResultEngine, Transaction, Wallet,
    payable::WalletTopup,
    wallet_histories::{self, WalletHistoryEntry},
    wallets,
};

use super::{Engine, SettleCmd, Settlement, with_tx};

impl Engine {
    /// Creates the wallet for a user. One wallet per user.
    pub async fn create_wallet(
        &self,
        user_id: &str,
        currency: Currency,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Wallet> {
        with_tx!(self, |db_tx| {
            let exists = wallets::Entity::find()
                .filter(wallets::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(user_id.to_string()));
            }

            let wallet = Wallet::new(user_id.to_string(), currency, created_at);
            wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;
            Ok(wallet)
        })
    }

    /// Returns a user's wallet snapshot.
    pub async fn wallet(&self, user_id: &str) -> ResultEngine<Wallet> {
        let model = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::WalletNotFound(user_id.to_string()))?;
        Wallet::try_from(model)
    }

    /// Lists a wallet's most recent history entries.
    pub async fn wallet_histories(
        &self,
        wallet_id: Uuid,
        limit: u64,
    ) -> ResultEngine<Vec<WalletHistoryEntry>> {
        let models = wallet_histories::Entity::find()
            .filter(wallet_histories::Column::WalletId.eq(wallet_id.to_string()))
            .order_by_desc(wallet_histories::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?;
        models
            .into_iter()
            .map(WalletHistoryEntry::try_from)
            .collect()
    }

    /// Administrative top-up: credits a user's wallet out-of-band.
    ///
    /// Runs through the regular settlement path with a [`WalletTopup`]
    /// payable, so the credit, the paid transaction and the topup history
    /// entry land in one atomic unit.
    pub async fn admin_top_up(
        &self,
        user_id: &str,
        amount: Money,
        note: Option<String>,
        acting_admin: &str,
        performed_at: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        let wallet = self.wallet(user_id).await?;
        let method = self.payment_method_by_tag("wallet").await?;
        let topup = WalletTopup::new(wallet.id, user_id.to_string(), amount, wallet.currency)?;

        match self
            .settle(
                &topup,
                SettleCmd {
                    payment_id: method.id,
                    external_ref: None,
                    note,
                    acting_user_id: acting_admin.to_string(),
                    performed_at,
                },
            )
            .await?
        {
            Settlement::Paid { transaction } => Ok(transaction),
            other => Err(EngineError::InvariantViolation(format!(
                "unexpected top-up outcome: {other:?}"
            ))),
        }
    }
}

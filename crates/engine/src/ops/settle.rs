//! The settlement engine.
//!
//! `settle` turns a payable entity plus a chosen payment method into a
//! recorded transaction. Wallet payments debit (or, for top-ups, credit) the
//! payer's wallet inside a single database transaction together with the
//! transaction upsert, the history entry and the effect outbox rows; any
//! other method defers to the external gateway flow without touching the
//! store. `record_gateway_payment` is the callback that flow uses once the
//! gateway confirmed.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, Statement, TransactionTrait,
    prelude::*,
};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, Transaction, Wallet,
    effects::{self, SettlementEffect},
    payable::Payable,
    payments::{PaymentMethod, PaymentTag},
    transactions::{self, TransactionStatus},
    wallet_histories::{self, HistoryDirection, WalletHistoryEntry},
    wallets,
};

use super::{Engine, MAX_STORE_ATTEMPTS, is_transient, with_tx};

const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Input for [`Engine::settle`].
#[derive(Clone, Debug)]
pub struct SettleCmd {
    /// Payment method chosen by the payer.
    pub payment_id: Uuid,
    /// Reference assigned by an external processor, when already known.
    pub external_ref: Option<String>,
    pub note: Option<String>,
    /// User performing the request. Never read from ambient state.
    pub acting_user_id: String,
    pub performed_at: DateTime<Utc>,
}

/// Input for [`Engine::record_gateway_payment`].
#[derive(Clone, Debug)]
pub struct GatewayPaymentCmd {
    pub payment_id: Uuid,
    /// Reference assigned by the gateway; required for reconciliation.
    pub external_ref: String,
    pub note: Option<String>,
    pub acting_user_id: String,
    pub performed_at: DateTime<Utc>,
}

/// Outcome of a settlement attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// The entity was charged and the transaction recorded.
    Paid { transaction: Transaction },
    /// Nothing was due; the existing paid transaction is returned unchanged.
    AlreadyPaid { transaction: Transaction },
    /// The method is external: no state was touched, the caller drives the
    /// gateway flow and later calls [`Engine::record_gateway_payment`].
    DeferredToGateway { tag: PaymentTag },
}

impl Engine {
    /// Settles a payable entity with the given payment method.
    ///
    /// Transient store failures are retried with bounded backoff; validation
    /// failures surface immediately. On success the freshly enqueued effects
    /// are drained inline, best-effort — failures are left to the worker.
    pub async fn settle<P: Payable>(
        &self,
        entity: &P,
        cmd: SettleCmd,
    ) -> ResultEngine<Settlement> {
        let mut attempt = 0u32;
        let outcome = loop {
            attempt += 1;
            match self.settle_once(entity, &cmd).await {
                Err(err) if is_transient(&err) && attempt < MAX_STORE_ATTEMPTS => {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        kind = entity.kind().as_str(),
                        "transient store failure during settlement, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => break other?,
            }
        };

        if let Settlement::Paid { transaction } = &outcome {
            self.drain_inline(transaction.id).await;
        }
        Ok(outcome)
    }

    /// Records an externally confirmed gateway payment for a payable entity.
    ///
    /// This is the other half of the `DeferredToGateway` contract: no wallet
    /// debit happens (top-ups are credited), the transaction is recorded as
    /// paid with the gateway tag and reference, and post-settlement effects
    /// run as usual.
    pub async fn record_gateway_payment<P: Payable>(
        &self,
        entity: &P,
        cmd: GatewayPaymentCmd,
    ) -> ResultEngine<Settlement> {
        let mut attempt = 0u32;
        let outcome = loop {
            attempt += 1;
            match self.record_gateway_once(entity, &cmd).await {
                Err(err) if is_transient(&err) && attempt < MAX_STORE_ATTEMPTS => {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        kind = entity.kind().as_str(),
                        "transient store failure recording gateway payment, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                other => break other?,
            }
        };

        if let Settlement::Paid { transaction } = &outcome {
            self.drain_inline(transaction.id).await;
        }
        Ok(outcome)
    }

    async fn record_gateway_once<P: Payable>(
        &self,
        entity: &P,
        cmd: &GatewayPaymentCmd,
    ) -> ResultEngine<Settlement> {
        with_tx!(self, |db_tx| {
            let method = self.require_payment_method(&db_tx, cmd.payment_id).await?;
            if method.tag.is_wallet() {
                return Err(EngineError::InvalidAmount(
                    "wallet payments settle internally, not via gateway".to_string(),
                ));
            }

            entity.ensure_settleable(&db_tx).await?;

            let existing = entity.existing_transaction(&db_tx).await?;
            let due = entity.charge_amount(&db_tx, existing.as_ref()).await?;

            if let Some(tx) = &existing
                && tx.status == TransactionStatus::Paid
                && (!entity.supports_partial_settlement() || !due.is_positive())
            {
                return Ok(Settlement::AlreadyPaid {
                    transaction: tx.clone(),
                });
            }
            if !due.is_positive() {
                return Err(EngineError::InvalidAmount(
                    "nothing due for settlement".to_string(),
                ));
            }

            // Top-ups are the one kind whose confirmation moves wallet money:
            // the credit is what was purchased. Everything else already got
            // its money through the gateway, outside the ledger.
            let wallet = if entity.ledger_direction() == HistoryDirection::Topup {
                let wallet = self.require_wallet(&db_tx, entity.payer_user_id()).await?;
                self.ensure_settlement_currency(entity, &wallet)?;
                self.credit_wallet(&db_tx, &wallet, due).await?;
                Some(wallet)
            } else {
                None
            };

            let transaction = self
                .upsert_paid_transaction(
                    &db_tx,
                    entity,
                    existing,
                    due,
                    method.tag.as_str(),
                    Some(cmd.external_ref.clone()),
                    cmd.note.clone(),
                    cmd.performed_at,
                )
                .await?;

            if let Some(wallet) = &wallet {
                self.append_history(
                    &db_tx,
                    entity,
                    wallet,
                    &transaction,
                    due,
                    method.tag.as_str(),
                    &cmd.acting_user_id,
                    cmd.performed_at,
                )
                .await?;
            }

            self.enqueue_effects(&db_tx, entity, transaction.id, cmd.performed_at)
                .await?;
            Ok(Settlement::Paid { transaction })
        })
    }

    async fn settle_once<P: Payable>(
        &self,
        entity: &P,
        cmd: &SettleCmd,
    ) -> ResultEngine<Settlement> {
        with_tx!(self, |db_tx| {
            let method = self.require_payment_method(&db_tx, cmd.payment_id).await?;

            if !method.tag.is_wallet() {
                // External method: the gateway flow owns the rest. Nothing is
                // written, so committing the read-only transaction is a no-op.
                return Ok(Settlement::DeferredToGateway { tag: method.tag });
            }

            self.settle_wallet(&db_tx, entity, &method, cmd).await
        })
    }

    async fn settle_wallet<P: Payable>(
        &self,
        db_tx: &DatabaseTransaction,
        entity: &P,
        method: &PaymentMethod,
        cmd: &SettleCmd,
    ) -> ResultEngine<Settlement> {
        entity.ensure_settleable(db_tx).await?;

        let existing = entity.existing_transaction(db_tx).await?;
        let due = entity.charge_amount(db_tx, existing.as_ref()).await?;

        if let Some(tx) = &existing
            && tx.status == TransactionStatus::Paid
            && (!entity.supports_partial_settlement() || !due.is_positive())
        {
            return Ok(Settlement::AlreadyPaid {
                transaction: tx.clone(),
            });
        }
        if !due.is_positive() {
            return Err(EngineError::InvalidAmount(
                "nothing due for settlement".to_string(),
            ));
        }

        let wallet = self.require_wallet(db_tx, entity.payer_user_id()).await?;
        self.ensure_settlement_currency(entity, &wallet)?;

        match entity.ledger_direction() {
            HistoryDirection::Withdraw => self.debit_wallet(db_tx, &wallet, due).await?,
            HistoryDirection::Topup => self.credit_wallet(db_tx, &wallet, due).await?,
        }

        let transaction = self
            .upsert_paid_transaction(
                db_tx,
                entity,
                existing,
                due,
                method.tag.as_str(),
                cmd.external_ref.clone(),
                cmd.note.clone(),
                cmd.performed_at,
            )
            .await?;

        self.append_history(
            db_tx,
            entity,
            &wallet,
            &transaction,
            due,
            "Wallet",
            &cmd.acting_user_id,
            cmd.performed_at,
        )
        .await?;

        self.enqueue_effects(db_tx, entity, transaction.id, cmd.performed_at)
            .await?;

        tracing::debug!(
            kind = entity.kind().as_str(),
            entity_id = %entity.id(),
            amount = due.minor(),
            "wallet settlement committed"
        );

        Ok(Settlement::Paid { transaction })
    }

    async fn require_wallet(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Wallet> {
        let model = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::WalletNotFound(user_id.to_string()))?;
        Wallet::try_from(model)
    }

    fn ensure_settlement_currency<P: Payable>(
        &self,
        entity: &P,
        wallet: &Wallet,
    ) -> ResultEngine<()> {
        if wallet.currency != entity.currency() {
            return Err(EngineError::CurrencyMismatch(format!(
                "wallet currency is {}, got {}",
                wallet.currency.code(),
                entity.currency().code()
            )));
        }
        Ok(())
    }

    /// Guarded atomic decrement: the sufficiency check and the write are one
    /// statement, so concurrent settlements against the same wallet cannot
    /// both pass the check and overdraw.
    async fn debit_wallet(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &Wallet,
        amount: Money,
    ) -> ResultEngine<()> {
        let backend = db_tx.get_database_backend();
        let result = db_tx
            .execute(Statement::from_sql_and_values(
                backend,
                "UPDATE wallets SET balance = balance - ? WHERE id = ? AND balance >= ?",
                vec![
                    amount.minor().into(),
                    wallet.id.to_string().into(),
                    amount.minor().into(),
                ],
            ))
            .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::InsufficientBalance(wallet.user_id.clone()));
        }
        Ok(())
    }

    async fn credit_wallet(
        &self,
        db_tx: &DatabaseTransaction,
        wallet: &Wallet,
        amount: Money,
    ) -> ResultEngine<()> {
        let backend = db_tx.get_database_backend();
        let result = db_tx
            .execute(Statement::from_sql_and_values(
                backend,
                "UPDATE wallets SET balance = balance + ? WHERE id = ?",
                vec![amount.minor().into(), wallet.id.to_string().into()],
            ))
            .await?;

        if result.rows_affected() == 0 {
            return Err(EngineError::WalletNotFound(wallet.user_id.clone()));
        }
        Ok(())
    }

    /// Creates the entity's transaction, or folds a new payment into the
    /// existing row.
    ///
    /// A previously paid row is bumped to the cumulative paid amount (partial
    /// order payments); a leftover pending row is overwritten with the amount
    /// actually charged now. Either way at most one row per entity exists —
    /// the store backs this with a unique index over paid transactions.
    #[allow(clippy::too_many_arguments)]
    async fn upsert_paid_transaction<P: Payable>(
        &self,
        db_tx: &DatabaseTransaction,
        entity: &P,
        existing: Option<Transaction>,
        due: Money,
        payment_tag: &str,
        external_ref: Option<String>,
        note: Option<String>,
        performed_at: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        match existing {
            Some(prev) => {
                let amount = if prev.status == TransactionStatus::Paid {
                    prev.amount.checked_add(due).ok_or_else(|| {
                        EngineError::InvalidAmount("amount too large".to_string())
                    })?
                } else {
                    due
                };

                let mut updated = prev;
                updated.amount = amount;
                updated.status = TransactionStatus::Paid;
                updated.payment_tag = payment_tag.to_string();
                updated.external_ref = external_ref.or(updated.external_ref);
                updated.performed_at = performed_at;
                if let Some(note) = note {
                    updated.note = Some(note);
                }

                let active = transactions::ActiveModel {
                    id: ActiveValue::Set(updated.id.to_string()),
                    amount: ActiveValue::Set(updated.amount.minor()),
                    status: ActiveValue::Set(updated.status.as_str().to_string()),
                    payment_tag: ActiveValue::Set(updated.payment_tag.clone()),
                    external_ref: ActiveValue::Set(updated.external_ref.clone()),
                    note: ActiveValue::Set(updated.note.clone()),
                    performed_at: ActiveValue::Set(updated.performed_at),
                    ..Default::default()
                };
                active.update(db_tx).await?;
                Ok(updated)
            }
            None => {
                let note = note.unwrap_or_else(|| {
                    format!(
                        "Transaction for {} #{}",
                        entity.kind().label(),
                        entity.id()
                    )
                });
                let tx = Transaction::new(
                    entity.kind(),
                    entity.id(),
                    entity.payer_user_id().to_string(),
                    due,
                    entity.currency(),
                    payment_tag.to_string(),
                    external_ref,
                    TransactionStatus::Paid,
                    Some(note),
                    performed_at,
                )?;
                transactions::ActiveModel::from(&tx).insert(db_tx).await?;
                Ok(tx)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn append_history<P: Payable>(
        &self,
        db_tx: &DatabaseTransaction,
        entity: &P,
        wallet: &Wallet,
        transaction: &Transaction,
        amount: Money,
        via: &str,
        acting_user_id: &str,
        performed_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let entry = WalletHistoryEntry::new(
            wallet.id,
            transaction.id,
            entity.ledger_direction(),
            amount,
            Some(format!(
                "Payment {} #{} via {via}",
                entity.kind().label(),
                entity.id()
            )),
            acting_user_id.to_string(),
            performed_at,
        );
        wallet_histories::ActiveModel::from(&entry)
            .insert(db_tx)
            .await?;
        Ok(())
    }

    async fn enqueue_effects<P: Payable>(
        &self,
        db_tx: &DatabaseTransaction,
        entity: &P,
        transaction_id: Uuid,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        for kind in entity.post_settlement_effects() {
            let record = SettlementEffect::new(transaction_id, kind, created_at);
            effects::ActiveModel::try_from(&record)?.insert(db_tx).await?;
        }
        Ok(())
    }

    async fn drain_inline(&self, transaction_id: Uuid) {
        if let Err(err) = self.drain_effects_for_transaction(transaction_id).await {
            tracing::warn!(
                transaction_id = %transaction_id,
                error = %err,
                "inline effects drain failed, left for the worker"
            );
        }
    }
}

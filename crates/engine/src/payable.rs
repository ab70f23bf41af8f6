//! The payable-entity contract.
//!
//! A [`Payable`] is anything the settlement engine can charge for: an order,
//! a wallet top-up, a shop subscription or an ads package. The engine depends
//! only on this trait; each concrete kind lives next to its entity module and
//! supplies its own charge computation, settleability guard and
//! post-settlement effects. Amounts are always recomputed from live store
//! state inside the settlement transaction, never from stale snapshots.

use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};
use uuid::Uuid;

use crate::{
    Currency, EffectKind, EngineError, Money, ResultEngine, Transaction,
    transactions::{self, PayableKind},
    wallet_histories::HistoryDirection,
};

pub trait Payable: Send + Sync {
    fn kind(&self) -> PayableKind;

    fn id(&self) -> Uuid;

    /// The user whose wallet is charged (or credited, for top-ups).
    fn payer_user_id(&self) -> &str;

    fn currency(&self) -> Currency;

    /// How a successful wallet settlement moves the balance.
    ///
    /// Purchases withdraw; wallet top-ups credit and bypass the sufficiency
    /// check entirely.
    fn ledger_direction(&self) -> HistoryDirection {
        HistoryDirection::Withdraw
    }

    /// Whether further settlements may charge a remaining delta after a paid
    /// transaction exists.
    ///
    /// Only orders support this (their total can grow after a first payment).
    /// For every other kind an existing paid transaction means settled, full
    /// stop — the guard must not depend on downstream effects like the active
    /// flag having been applied yet.
    fn supports_partial_settlement(&self) -> bool {
        false
    }

    /// Effects to enqueue once the settlement committed.
    fn post_settlement_effects(&self) -> Vec<EffectKind> {
        Vec::new()
    }

    /// Rejects settlement before any mutation happens.
    ///
    /// Subscriptions and ads packages fail here with `AlreadyActive` once
    /// their active flag is set.
    fn ensure_settleable(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> impl Future<Output = ResultEngine<()>> + Send {
        let _ = db_tx;
        async { Ok(()) }
    }

    /// Amount currently due, recomputed from store state.
    ///
    /// `existing` is the entity's transaction, if any; orders subtract the
    /// already-paid amount from the live total to support partial payment.
    fn charge_amount(
        &self,
        db_tx: &DatabaseTransaction,
        existing: Option<&Transaction>,
    ) -> impl Future<Output = ResultEngine<Money>> + Send;

    /// The entity's recorded transaction, if one exists.
    ///
    /// At most one row exists per entity (cumulative updates plus a store
    /// backstop index keep it that way).
    fn existing_transaction(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> impl Future<Output = ResultEngine<Option<Transaction>>> + Send {
        let kind = self.kind();
        let id = self.id();
        async move {
            let model = transactions::Entity::find()
                .filter(transactions::Column::OwnerKind.eq(kind.as_str()))
                .filter(transactions::Column::OwnerId.eq(id.to_string()))
                .order_by_desc(transactions::Column::CreatedAt)
                .one(db_tx)
                .await?;
            model.map(Transaction::try_from).transpose()
        }
    }
}

impl PayableKind {
    /// Human label used in transaction and history notes.
    pub fn label(self) -> &'static str {
        match self {
            Self::Order => "Order",
            Self::WalletTopup => "Wallet",
            Self::ShopSubscription => "Subscription",
            Self::ShopAdsPackage => "Ads",
        }
    }
}

/// A requested wallet top-up.
///
/// The balance mutation itself is the purchased effect: a settled top-up
/// credits the wallet instead of debiting it, so there is no activation step
/// and no sufficiency check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletTopup {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub user_id: String,
    pub amount: Money,
    pub currency: Currency,
}

impl WalletTopup {
    pub fn new(
        wallet_id: Uuid,
        user_id: String,
        amount: Money,
        currency: Currency,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "top-up amount must be > 0".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            wallet_id,
            user_id,
            amount,
            currency,
        })
    }
}

impl Payable for WalletTopup {
    fn kind(&self) -> PayableKind {
        PayableKind::WalletTopup
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

    fn ledger_direction(&self) -> HistoryDirection {
        HistoryDirection::Topup
    }

    async fn charge_amount(
        &self,
        _db_tx: &DatabaseTransaction,
        _existing: Option<&Transaction>,
    ) -> ResultEngine<Money> {
        Ok(self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topup_rejects_non_positive_amount() {
        let err = WalletTopup::new(Uuid::new_v4(), "u1".to_string(), Money::ZERO, Currency::Usd)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_amount");
    }

    #[test]
    fn topup_credits_instead_of_debiting() {
        let topup = WalletTopup::new(
            Uuid::new_v4(),
            "u1".to_string(),
            Money::new(500),
            Currency::Usd,
        )
        .unwrap();
        assert_eq!(topup.ledger_direction(), HistoryDirection::Topup);
        assert!(topup.post_settlement_effects().is_empty());
    }
}

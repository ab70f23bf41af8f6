pub use ads_packages::AdsPackage;
pub use currency::Currency;
pub use effects::{EffectKind, EffectStatus, SettlementEffect};
pub use error::EngineError;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, GatewayPaymentCmd, OrderLine, SettleCmd, Settlement};
pub use order_details::OrderDetail;
pub use orders::Order;
pub use payable::{Payable, WalletTopup};
pub use payments::{PaymentMethod, PaymentTag};
pub use shop_ads_packages::ShopAdsPackage;
pub use shop_subscriptions::ShopSubscription;
pub use transactions::{PayableKind, Transaction, TransactionStatus};
pub use wallet_histories::{HistoryDirection, WalletHistoryEntry};
pub use wallets::Wallet;

mod ads_packages;
mod currency;
mod digital_files;
mod effects;
mod error;
mod money;
mod ops;
mod order_details;
mod orders;
mod payable;
mod payments;
mod shop_ads_packages;
mod shop_subscriptions;
mod stocks;
mod transactions;
mod user_digital_files;
mod wallet_histories;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;

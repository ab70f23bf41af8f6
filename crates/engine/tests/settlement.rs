use chrono::Utc;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    Currency, Engine, EngineError, GatewayPaymentCmd, HistoryDirection, Money, Order, OrderLine,
    PayableKind, PaymentTag, SettleCmd, Settlement, TransactionStatus, WalletTopup,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db.clone()).build();
    engine.seed_payment_methods().await.unwrap();
    (engine, db)
}

async fn method_id(engine: &Engine, tag: &str) -> Uuid {
    engine.payment_method_by_tag(tag).await.unwrap().id
}

fn settle_cmd(payment_id: Uuid, user: &str) -> SettleCmd {
    SettleCmd {
        payment_id,
        external_ref: None,
        note: None,
        acting_user_id: user.to_string(),
        performed_at: Utc::now(),
    }
}

/// Creates a wallet for `user` funded with `balance` minor units.
async fn funded_wallet(engine: &Engine, user: &str, balance: i64) {
    engine
        .create_wallet(user, Currency::Usd, Utc::now())
        .await
        .unwrap();
    if balance > 0 {
        engine
            .admin_top_up(user, Money::new(balance), None, "admin", Utc::now())
            .await
            .unwrap();
    }
}

/// Creates an order with one line of the given price, backed by a fresh stock.
async fn single_line_order(engine: &Engine, user: &str, price: i64) -> Order {
    let stock_id = engine.create_stock(Uuid::new_v4()).await.unwrap();
    engine
        .create_order(
            user,
            Currency::Usd,
            vec![OrderLine {
                stock_id,
                quantity: 1,
                price: Money::new(price),
            }],
            Utc::now(),
        )
        .await
        .unwrap()
}

async fn transaction_count(db: &DatabaseConnection, owner_id: Uuid) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_sql_and_values(
            backend,
            "SELECT COUNT(*) AS cnt FROM transactions WHERE owner_id = ?",
            vec![owner_id.to_string().into()],
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "cnt").unwrap()
}

#[tokio::test]
async fn wallet_settlement_debits_and_records_history() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "alice", 10_000).await;

    let order = single_line_order(&engine, "alice", 2_500).await;
    let wallet_method = method_id(&engine, "wallet").await;

    let outcome = engine
        .settle(&order, settle_cmd(wallet_method, "alice"))
        .await
        .unwrap();

    let Settlement::Paid { transaction } = outcome else {
        panic!("expected Paid, got {outcome:?}");
    };
    assert_eq!(transaction.amount, Money::new(2_500));
    assert_eq!(transaction.status, TransactionStatus::Paid);
    assert_eq!(transaction.payment_tag, "wallet");
    assert_eq!(transaction.owner_kind, PayableKind::Order);

    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.balance, Money::new(7_500));

    let histories = engine.wallet_histories(wallet.id, 10).await.unwrap();
    // One topup from funding, one withdraw from the settlement.
    assert_eq!(histories.len(), 2);
    let withdraw = histories
        .iter()
        .find(|h| h.direction == HistoryDirection::Withdraw)
        .unwrap();
    assert_eq!(withdraw.amount, Money::new(2_500));
    assert_eq!(withdraw.transaction_id, transaction.id);
}

#[tokio::test]
async fn settling_twice_is_idempotent() {
    let (engine, db) = engine_with_db().await;
    funded_wallet(&engine, "alice", 10_000).await;

    let order = single_line_order(&engine, "alice", 2_500).await;
    let wallet_method = method_id(&engine, "wallet").await;

    let first = engine
        .settle(&order, settle_cmd(wallet_method, "alice"))
        .await
        .unwrap();
    assert!(matches!(first, Settlement::Paid { .. }));

    let second = engine
        .settle(&order, settle_cmd(wallet_method, "alice"))
        .await
        .unwrap();
    let Settlement::AlreadyPaid { transaction } = second else {
        panic!("expected AlreadyPaid, got {second:?}");
    };
    assert_eq!(transaction.amount, Money::new(2_500));

    // Exactly one debit and one transaction row.
    let wallet = engine.wallet("alice").await.unwrap();
    assert_eq!(wallet.balance, Money::new(7_500));
    assert_eq!(transaction_count(&db, order.id).await, 1);
}

#[tokio::test]
async fn partial_payment_debits_only_the_delta() {
    let (engine, db) = engine_with_db().await;
    funded_wallet(&engine, "alice", 20_000).await;

    let order = single_line_order(&engine, "alice", 4_000).await;
    let wallet_method = method_id(&engine, "wallet").await;

    engine
        .settle(&order, settle_cmd(wallet_method, "alice"))
        .await
        .unwrap();
    assert_eq!(
        engine.wallet("alice").await.unwrap().balance,
        Money::new(16_000)
    );

    // The order grows after the first payment (items added later).
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE orders SET total_price = ? WHERE id = ?",
        vec![10_000i64.into(), order.id.to_string().into()],
    ))
    .await
    .unwrap();

    let outcome = engine
        .settle(&order, settle_cmd(wallet_method, "alice"))
        .await
        .unwrap();
    let Settlement::Paid { transaction } = outcome else {
        panic!("expected Paid, got {outcome:?}");
    };

    // Only the 6000 delta was debited; the row now carries the cumulative
    // paid amount.
    assert_eq!(
        engine.wallet("alice").await.unwrap().balance,
        Money::new(10_000)
    );
    assert_eq!(transaction.amount, Money::new(10_000));
    assert_eq!(transaction_count(&db, order.id).await, 1);

    let third = engine
        .settle(&order, settle_cmd(wallet_method, "alice"))
        .await
        .unwrap();
    assert!(matches!(third, Settlement::AlreadyPaid { .. }));
}

#[tokio::test]
async fn already_active_subscription_is_rejected_before_any_mutation() {
    let (engine, db) = engine_with_db().await;
    funded_wallet(&engine, "bob", 10_000).await;

    let subscription = engine
        .create_subscription(Uuid::new_v4(), "bob", Money::new(3_000), Currency::Usd)
        .await
        .unwrap();

    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "UPDATE shop_subscriptions SET active = 1 WHERE id = ?",
        vec![subscription.id.to_string().into()],
    ))
    .await
    .unwrap();

    let wallet_method = method_id(&engine, "wallet").await;
    let err = engine
        .settle(&subscription, settle_cmd(wallet_method, "bob"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::AlreadyActive(format!("subscription #{}", subscription.id))
    );

    assert_eq!(
        engine.wallet("bob").await.unwrap().balance,
        Money::new(10_000)
    );
    assert_eq!(transaction_count(&db, subscription.id).await, 0);
}

#[tokio::test]
async fn subscription_settlement_activates_it() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "bob", 10_000).await;

    let subscription = engine
        .create_subscription(Uuid::new_v4(), "bob", Money::new(3_000), Currency::Usd)
        .await
        .unwrap();

    let wallet_method = method_id(&engine, "wallet").await;
    let outcome = engine
        .settle(&subscription, settle_cmd(wallet_method, "bob"))
        .await
        .unwrap();
    assert!(matches!(outcome, Settlement::Paid { .. }));

    let reloaded = engine.subscription(subscription.id).await.unwrap();
    assert!(reloaded.active);
    assert_eq!(
        engine.wallet("bob").await.unwrap().balance,
        Money::new(7_000)
    );

    // A second attempt trips the active guard, not the idempotency guard.
    let err = engine
        .settle(&subscription, settle_cmd(wallet_method, "bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyActive(_)));
}

#[tokio::test]
async fn ads_package_settlement_charges_catalog_price_and_activates() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "carla", 10_000).await;

    let package = engine.create_ads_package(Money::new(4_500)).await.unwrap();
    let purchase = engine
        .purchase_ads_package(package.id, Uuid::new_v4(), "carla", Currency::Usd)
        .await
        .unwrap();

    let wallet_method = method_id(&engine, "wallet").await;
    let outcome = engine
        .settle(&purchase, settle_cmd(wallet_method, "carla"))
        .await
        .unwrap();
    let Settlement::Paid { transaction } = outcome else {
        panic!("expected Paid, got {outcome:?}");
    };
    assert_eq!(transaction.amount, Money::new(4_500));

    let reloaded = engine.shop_ads_package(purchase.id).await.unwrap();
    assert!(reloaded.active);
    assert_eq!(
        engine.wallet("carla").await.unwrap().balance,
        Money::new(5_500)
    );
}

#[tokio::test]
async fn gateway_deferral_is_side_effect_free() {
    let (engine, db) = engine_with_db().await;
    funded_wallet(&engine, "alice", 10_000).await;

    let order = single_line_order(&engine, "alice", 2_500).await;
    let stripe = method_id(&engine, "stripe").await;

    let outcome = engine
        .settle(&order, settle_cmd(stripe, "alice"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        Settlement::DeferredToGateway {
            tag: PaymentTag::Gateway("stripe".to_string())
        }
    );

    assert_eq!(
        engine.wallet("alice").await.unwrap().balance,
        Money::new(10_000)
    );
    assert_eq!(transaction_count(&db, order.id).await, 0);

    let wallet = engine.wallet("alice").await.unwrap();
    let histories = engine.wallet_histories(wallet.id, 10).await.unwrap();
    assert_eq!(histories.len(), 1); // only the funding topup
}

#[tokio::test]
async fn gateway_confirmation_records_the_paid_transaction() {
    let (engine, db) = engine_with_db().await;
    funded_wallet(&engine, "alice", 10_000).await;

    let order = single_line_order(&engine, "alice", 2_500).await;
    let stripe = method_id(&engine, "stripe").await;

    let outcome = engine
        .settle(&order, settle_cmd(stripe, "alice"))
        .await
        .unwrap();
    assert!(matches!(outcome, Settlement::DeferredToGateway { .. }));

    let confirmed = engine
        .record_gateway_payment(
            &order,
            GatewayPaymentCmd {
                payment_id: stripe,
                external_ref: "pi_12345".to_string(),
                note: None,
                acting_user_id: "alice".to_string(),
                performed_at: Utc::now(),
            },
        )
        .await
        .unwrap();

    let Settlement::Paid { transaction } = confirmed else {
        panic!("expected Paid, got {confirmed:?}");
    };
    assert_eq!(transaction.payment_tag, "stripe");
    assert_eq!(transaction.external_ref.as_deref(), Some("pi_12345"));
    assert_eq!(transaction.amount, Money::new(2_500));

    // No wallet movement for a gateway purchase.
    assert_eq!(
        engine.wallet("alice").await.unwrap().balance,
        Money::new(10_000)
    );
    assert_eq!(transaction_count(&db, order.id).await, 1);
}

#[tokio::test]
async fn insufficient_balance_is_terminal_and_mutates_nothing() {
    let (engine, db) = engine_with_db().await;
    funded_wallet(&engine, "dave", 1_000).await;

    let order = single_line_order(&engine, "dave", 2_500).await;
    let wallet_method = method_id(&engine, "wallet").await;

    let err = engine
        .settle(&order, settle_cmd(wallet_method, "dave"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientBalance("dave".to_string()));

    assert_eq!(
        engine.wallet("dave").await.unwrap().balance,
        Money::new(1_000)
    );
    assert_eq!(transaction_count(&db, order.id).await, 0);
}

#[tokio::test]
async fn settlement_without_wallet_fails() {
    let (engine, _db) = engine_with_db().await;

    let order = single_line_order(&engine, "ghost", 2_500).await;
    let wallet_method = method_id(&engine, "wallet").await;

    let err = engine
        .settle(&order, settle_cmd(wallet_method, "ghost"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::WalletNotFound("ghost".to_string()));
}

#[tokio::test]
async fn disabled_payment_method_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "alice", 10_000).await;

    let order = single_line_order(&engine, "alice", 2_500).await;
    let wallet_method = method_id(&engine, "wallet").await;

    engine
        .set_payment_method_active("wallet", false)
        .await
        .unwrap();

    let err = engine
        .settle(&order, settle_cmd(wallet_method, "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::PaymentMethodNotFound(_)));
}

#[tokio::test]
async fn concurrent_settlements_cannot_overdraw() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "erin", 3_000).await;

    let order_a = single_line_order(&engine, "erin", 2_000).await;
    let order_b = single_line_order(&engine, "erin", 2_000).await;
    let wallet_method = method_id(&engine, "wallet").await;

    let (a, b) = tokio::join!(
        engine.settle(&order_a, settle_cmd(wallet_method, "erin")),
        engine.settle(&order_b, settle_cmd(wallet_method, "erin")),
    );

    let results = [a, b];
    let paid = results
        .iter()
        .filter(|r| matches!(r, Ok(Settlement::Paid { .. })))
        .count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::InsufficientBalance(_))))
        .count();
    assert_eq!(paid, 1);
    assert_eq!(rejected, 1);

    let wallet = engine.wallet("erin").await.unwrap();
    assert_eq!(wallet.balance, Money::new(1_000));
}

#[tokio::test]
async fn digital_unlock_grants_only_active_files() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "fay", 10_000).await;

    // Line 1: product with an active digital file. Line 2: plain product.
    let product_with_file = Uuid::new_v4();
    let plain_product = Uuid::new_v4();
    let stock_with_file = engine.create_stock(product_with_file).await.unwrap();
    let plain_stock = engine.create_stock(plain_product).await.unwrap();
    let file_id = engine
        .create_digital_file(product_with_file, true)
        .await
        .unwrap();

    let order = engine
        .create_order(
            "fay",
            Currency::Usd,
            vec![
                OrderLine {
                    stock_id: stock_with_file,
                    quantity: 2,
                    price: Money::new(3_000),
                },
                OrderLine {
                    stock_id: plain_stock,
                    quantity: 1,
                    price: Money::new(1_000),
                },
            ],
            Utc::now(),
        )
        .await
        .unwrap();

    let wallet_method = method_id(&engine, "wallet").await;
    engine
        .settle(&order, settle_cmd(wallet_method, "fay"))
        .await
        .unwrap();

    let grants = engine.digital_file_grants("fay").await.unwrap();
    assert_eq!(grants, vec![file_id]);

    assert_eq!(engine.stock_sold_count(stock_with_file).await.unwrap(), 2);
    assert_eq!(engine.stock_sold_count(plain_stock).await.unwrap(), 0);
}

#[tokio::test]
async fn effects_drain_is_idempotent() {
    let (engine, _db) = engine_with_db().await;
    funded_wallet(&engine, "fay", 10_000).await;

    let product = Uuid::new_v4();
    let stock = engine.create_stock(product).await.unwrap();
    let file_id = engine.create_digital_file(product, true).await.unwrap();
    let order = engine
        .create_order(
            "fay",
            Currency::Usd,
            vec![OrderLine {
                stock_id: stock,
                quantity: 1,
                price: Money::new(2_000),
            }],
            Utc::now(),
        )
        .await
        .unwrap();

    let wallet_method = method_id(&engine, "wallet").await;
    engine
        .settle(&order, settle_cmd(wallet_method, "fay"))
        .await
        .unwrap();

    // The inline drain already applied everything.
    assert_eq!(engine.drain_pending_effects(100).await.unwrap(), 0);
    assert_eq!(engine.digital_file_grants("fay").await.unwrap(), vec![file_id]);
    assert_eq!(engine.stock_sold_count(stock).await.unwrap(), 1);
}

#[tokio::test]
async fn admin_top_up_credits_and_writes_topup_history() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_wallet("gina", Currency::Usd, Utc::now())
        .await
        .unwrap();

    let transaction = engine
        .admin_top_up(
            "gina",
            Money::new(5_000),
            Some("promo credit".to_string()),
            "admin",
            Utc::now(),
        )
        .await
        .unwrap();
    assert_eq!(transaction.owner_kind, PayableKind::WalletTopup);
    assert_eq!(transaction.status, TransactionStatus::Paid);

    let wallet = engine.wallet("gina").await.unwrap();
    assert_eq!(wallet.balance, Money::new(5_000));

    let histories = engine.wallet_histories(wallet.id, 10).await.unwrap();
    assert_eq!(histories.len(), 1);
    assert_eq!(histories[0].direction, HistoryDirection::Topup);
    assert_eq!(histories[0].amount, Money::new(5_000));
    assert_eq!(histories[0].created_by, "admin");
}

#[tokio::test]
async fn gateway_top_up_credits_only_on_confirmation() {
    let (engine, _db) = engine_with_db().await;
    engine
        .create_wallet("hank", Currency::Usd, Utc::now())
        .await
        .unwrap();
    let wallet = engine.wallet("hank").await.unwrap();

    let topup = WalletTopup::new(
        wallet.id,
        "hank".to_string(),
        Money::new(7_500),
        Currency::Usd,
    )
    .unwrap();
    let paypal = method_id(&engine, "paypal").await;

    let outcome = engine
        .settle(&topup, settle_cmd(paypal, "hank"))
        .await
        .unwrap();
    assert!(matches!(outcome, Settlement::DeferredToGateway { .. }));
    assert_eq!(engine.wallet("hank").await.unwrap().balance, Money::ZERO);

    let confirmed = engine
        .record_gateway_payment(
            &topup,
            GatewayPaymentCmd {
                payment_id: paypal,
                external_ref: "PAY-789".to_string(),
                note: None,
                acting_user_id: "hank".to_string(),
                performed_at: Utc::now(),
            },
        )
        .await
        .unwrap();
    assert!(matches!(confirmed, Settlement::Paid { .. }));

    let wallet = engine.wallet("hank").await.unwrap();
    assert_eq!(wallet.balance, Money::new(7_500));

    let histories = engine.wallet_histories(wallet.id, 10).await.unwrap();
    assert_eq!(histories.len(), 1);
    assert_eq!(histories[0].direction, HistoryDirection::Topup);
}

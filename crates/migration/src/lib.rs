pub use sea_orm_migration::prelude::*;

mod m20260505_090000_wallets;
mod m20260505_100000_payments;
mod m20260505_110000_transactions;
mod m20260512_090000_orders;
mod m20260512_100000_digital_files;
mod m20260519_090000_subscriptions;
mod m20260519_100000_ads;
mod m20260526_090000_settlement_effects;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260505_090000_wallets::Migration),
            Box::new(m20260505_100000_payments::Migration),
            Box::new(m20260505_110000_transactions::Migration),
            Box::new(m20260512_090000_orders::Migration),
            Box::new(m20260512_100000_digital_files::Migration),
            Box::new(m20260519_090000_subscriptions::Migration),
            Box::new(m20260519_100000_ads::Migration),
            Box::new(m20260526_090000_settlement_effects::Migration),
        ]
    }
}

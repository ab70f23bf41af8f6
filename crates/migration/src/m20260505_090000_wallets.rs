use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Wallets {
    Table,
    Id,
    UserId,
    Balance,
    Currency,
    CreatedAt,
}

#[derive(Iden)]
enum WalletHistories {
    Table,
    Id,
    WalletId,
    TransactionId,
    Direction,
    Amount,
    Note,
    Status,
    CreatedBy,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Wallets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Wallets::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Wallets::UserId).string().not_null())
                    .col(ColumnDef::new(Wallets::Balance).big_integer().not_null())
                    .col(ColumnDef::new(Wallets::Currency).string().not_null())
                    .col(ColumnDef::new(Wallets::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uidx-wallets-user_id")
                    .table(Wallets::Table)
                    .col(Wallets::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(WalletHistories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletHistories::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WalletHistories::WalletId).string().not_null())
                    .col(
                        ColumnDef::new(WalletHistories::TransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletHistories::Direction)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletHistories::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletHistories::Note).string())
                    .col(ColumnDef::new(WalletHistories::Status).string().not_null())
                    .col(
                        ColumnDef::new(WalletHistories::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletHistories::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-wallet_histories-wallet_id")
                            .from(WalletHistories::Table, WalletHistories::WalletId)
                            .to(Wallets::Table, Wallets::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-wallet_histories-wallet_id-created_at")
                    .table(WalletHistories::Table)
                    .col(WalletHistories::WalletId)
                    .col(WalletHistories::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WalletHistories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Wallets::Table).to_owned())
            .await?;
        Ok(())
    }
}

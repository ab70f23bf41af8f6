use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum SettlementEffects {
    Table,
    Id,
    TransactionId,
    Kind,
    Payload,
    Status,
    Attempts,
    CreatedAt,
    CompletedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SettlementEffects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SettlementEffects::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SettlementEffects::TransactionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SettlementEffects::Kind).string().not_null())
                    .col(
                        ColumnDef::new(SettlementEffects::Payload)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementEffects::Status)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementEffects::Attempts)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SettlementEffects::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SettlementEffects::CompletedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-settlement_effects-status-created_at")
                    .table(SettlementEffects::Table)
                    .col(SettlementEffects::Status)
                    .col(SettlementEffects::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-settlement_effects-transaction_id")
                    .table(SettlementEffects::Table)
                    .col(SettlementEffects::TransactionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SettlementEffects::Table).to_owned())
            .await?;
        Ok(())
    }
}

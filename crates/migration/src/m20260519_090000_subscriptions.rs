use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum ShopSubscriptions {
    Table,
    Id,
    ShopId,
    UserId,
    Price,
    Currency,
    Active,
    ExpiredAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShopSubscriptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShopSubscriptions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ShopSubscriptions::ShopId).string().not_null())
                    .col(ColumnDef::new(ShopSubscriptions::UserId).string().not_null())
                    .col(
                        ColumnDef::new(ShopSubscriptions::Price)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShopSubscriptions::Currency)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShopSubscriptions::Active)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShopSubscriptions::ExpiredAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-shop_subscriptions-shop_id")
                    .table(ShopSubscriptions::Table)
                    .col(ShopSubscriptions::ShopId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShopSubscriptions::Table).to_owned())
            .await?;
        Ok(())
    }
}

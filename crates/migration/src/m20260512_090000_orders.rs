use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
pub enum Orders {
    Table,
    Id,
    UserId,
    TotalPrice,
    Currency,
    CreatedAt,
}

#[derive(Iden)]
pub enum Stocks {
    Table,
    Id,
    ProductId,
    SoldCount,
}

#[derive(Iden)]
enum OrderDetails {
    Table,
    Id,
    OrderId,
    StockId,
    Quantity,
    Price,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Orders::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Orders::UserId).string().not_null())
                    .col(ColumnDef::new(Orders::TotalPrice).big_integer().not_null())
                    .col(ColumnDef::new(Orders::Currency).string().not_null())
                    .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Stocks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stocks::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(Stocks::ProductId).string().not_null())
                    .col(ColumnDef::new(Stocks::SoldCount).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-stocks-product_id")
                    .table(Stocks::Table)
                    .col(Stocks::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OrderDetails::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderDetails::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderDetails::OrderId).string().not_null())
                    .col(ColumnDef::new(OrderDetails::StockId).string().not_null())
                    .col(ColumnDef::new(OrderDetails::Quantity).integer().not_null())
                    .col(ColumnDef::new(OrderDetails::Price).big_integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-order_details-order_id")
                            .from(OrderDetails::Table, OrderDetails::OrderId)
                            .to(Orders::Table, Orders::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-order_details-stock_id")
                            .from(OrderDetails::Table, OrderDetails::StockId)
                            .to(Stocks::Table, Stocks::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-order_details-order_id")
                    .table(OrderDetails::Table)
                    .col(OrderDetails::OrderId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderDetails::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Stocks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await?;
        Ok(())
    }
}

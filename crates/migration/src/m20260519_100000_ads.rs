use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum AdsPackages {
    Table,
    Id,
    Price,
    Active,
}

#[derive(Iden)]
enum ShopAdsPackages {
    Table,
    Id,
    AdsPackageId,
    ShopId,
    UserId,
    Currency,
    Active,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdsPackages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AdsPackages::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AdsPackages::Price).big_integer().not_null())
                    .col(ColumnDef::new(AdsPackages::Active).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShopAdsPackages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShopAdsPackages::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ShopAdsPackages::AdsPackageId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShopAdsPackages::ShopId).string().not_null())
                    .col(ColumnDef::new(ShopAdsPackages::UserId).string().not_null())
                    .col(
                        ColumnDef::new(ShopAdsPackages::Currency)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShopAdsPackages::Active)
                            .boolean()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-shop_ads_packages-ads_package_id")
                            .from(ShopAdsPackages::Table, ShopAdsPackages::AdsPackageId)
                            .to(AdsPackages::Table, AdsPackages::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-shop_ads_packages-shop_id")
                    .table(ShopAdsPackages::Table)
                    .col(ShopAdsPackages::ShopId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShopAdsPackages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AdsPackages::Table).to_owned())
            .await?;
        Ok(())
    }
}

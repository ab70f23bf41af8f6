use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum DigitalFiles {
    Table,
    Id,
    ProductId,
    Active,
}

#[derive(Iden)]
enum UserDigitalFiles {
    Table,
    Id,
    DigitalFileId,
    UserId,
    Active,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DigitalFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DigitalFiles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DigitalFiles::ProductId).string().not_null())
                    .col(ColumnDef::new(DigitalFiles::Active).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-digital_files-product_id")
                    .table(DigitalFiles::Table)
                    .col(DigitalFiles::ProductId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserDigitalFiles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserDigitalFiles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserDigitalFiles::DigitalFileId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserDigitalFiles::UserId).string().not_null())
                    .col(
                        ColumnDef::new(UserDigitalFiles::Active)
                            .boolean()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user_digital_files-digital_file_id")
                            .from(UserDigitalFiles::Table, UserDigitalFiles::DigitalFileId)
                            .to(DigitalFiles::Table, DigitalFiles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Grant upsert is keyed by this pair; the index makes replays no-ops
        // at the store level too.
        manager
            .create_index(
                Index::create()
                    .name("uidx-user_digital_files-file-user")
                    .table(UserDigitalFiles::Table)
                    .col(UserDigitalFiles::DigitalFileId)
                    .col(UserDigitalFiles::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserDigitalFiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(DigitalFiles::Table).to_owned())
            .await?;
        Ok(())
    }
}

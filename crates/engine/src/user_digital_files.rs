//! Digital-file access grants.
//!
//! One row per `(digital_file_id, user_id)` pair (unique index); the unlock
//! effect upserts, so replaying it grants nothing twice.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "user_digital_files")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub digital_file_id: String,
    pub user_id: String,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::digital_files::Entity",
        from = "Column::DigitalFileId",
        to = "super::digital_files::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    DigitalFiles,
}

impl Related<super::digital_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DigitalFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

//! Image attached to a record

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "record_images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub record_id: i32,

    /// Name on disk
    pub filename: String,

    /// Name as uploaded
    pub original_filename: String,

    /// Path relative to the upload root
    pub file_path: String,

    pub thumbnail_path: Option<String>,

    pub file_size: i64,

    pub mime_type: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub sort_order: i32,

    pub created_at: DateTimeUtc,
}

impl Model {
    /// Download path of the image, relative to the API root
    pub fn url(&self) -> String {
        format!("/records/{}/images/{}/file", self.record_id, self.id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::record::Entity",
        from = "Column::RecordId",
        to = "super::record::Column::Id",
        on_delete = "Cascade"
    )]
    Record,
}

impl Related<super::record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Record.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

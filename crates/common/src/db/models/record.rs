//! Record entity: the central field record
//!
//! `content` is kept exactly as submitted. Typed access goes through
//! [`crate::records::RecordContent`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of field record
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    #[sea_orm(string_value = "field_note")]
    FieldNote,
    #[sea_orm(string_value = "interview")]
    Interview,
    #[sea_orm(string_value = "observation")]
    Observation,
    #[sea_orm(string_value = "other")]
    Other,
}

impl RecordType {
    /// Wire value, as stored and as accepted in query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::FieldNote => "field_note",
            RecordType::Interview => "interview",
            RecordType::Observation => "observation",
            RecordType::Other => "other",
        }
    }

    /// Human-readable label used in exports
    pub fn label(&self) -> &'static str {
        match self {
            RecordType::FieldNote => "Field note",
            RecordType::Interview => "Interview",
            RecordType::Observation => "Observation",
            RecordType::Other => "Other",
        }
    }
}

/// Editing state of a record
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "archived")]
    Archived,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Completed => "completed",
            RecordStatus::Archived => "archived",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "Draft",
            RecordStatus::Completed => "Completed",
            RecordStatus::Archived => "Archived",
        }
    }
}

/// Maximum title length in characters
pub const TITLE_MAX_LEN: usize = 200;

/// Maximum time-range label length in characters
pub const TIME_RANGE_MAX_LEN: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub title: String,

    /// Stored in the `type` column
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: RecordType,

    /// When the recorded event happened
    pub record_date: DateTimeUtc,

    pub time_range: Option<String>,

    /// Minutes
    pub duration: Option<i32>,

    pub field_id: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub specific_location: Option<String>,

    #[sea_orm(column_type = "Json")]
    pub content: Json,

    pub status: RecordStatus,

    pub version: i32,

    pub created_by: i32,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::field::Entity",
        from = "Column::FieldId",
        to = "super::field::Column::Id",
        on_delete = "SetNull"
    )]
    Field,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,

    #[sea_orm(has_many = "super::record_image::Entity")]
    Images,

    #[sea_orm(has_many = "super::record_participant::Entity")]
    RecordParticipants,

    #[sea_orm(has_many = "super::record_tag::Entity")]
    RecordTags,
}

impl Related<super::field::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Field.def()
    }
}

impl Related<super::record_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::record_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecordParticipants.def()
    }
}

impl Related<super::record_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecordTags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

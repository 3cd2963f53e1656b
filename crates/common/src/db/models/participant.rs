//! Participant entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How carefully a participant's data must be handled
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum DataSensitivity {
    #[sea_orm(string_value = "low")]
    Low,
    #[default]
    #[sea_orm(string_value = "normal")]
    Normal,
    #[sea_orm(string_value = "high")]
    High,
    #[sea_orm(string_value = "confidential")]
    Confidential,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name_or_code: String,

    pub gender: Option<String>,

    pub age_range: Option<String>,

    pub occupation: Option<String>,

    pub education: Option<String>,

    #[sea_orm(column_type = "Json", nullable)]
    pub contact_info: Option<Json>,

    #[sea_orm(column_type = "Json", nullable)]
    pub social_attributes: Option<Json>,

    #[sea_orm(column_type = "Json", nullable)]
    pub research_related: Option<Json>,

    pub is_anonymous: bool,

    pub data_sensitivity: DataSensitivity,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    pub created_by: i32,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,

    #[sea_orm(has_many = "super::record_participant::Entity")]
    RecordParticipants,
}

impl Related<super::record_participant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecordParticipants.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

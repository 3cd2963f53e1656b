//! Field entity: the physical or social site where research happens

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Separator between the parts of a field's full location label
pub const LOCATION_SEPARATOR: &str = " - ";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "fields")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub region: String,

    pub location: String,

    pub sub_field: Option<String>,

    pub latitude: Option<f64>,

    pub longitude: Option<f64>,

    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,

    /// Environment, cultural background, accessibility...
    #[sea_orm(column_type = "Json", nullable)]
    pub description: Option<Json>,

    /// Active hours, seasonal changes...
    #[sea_orm(column_type = "Json", nullable)]
    pub time_attributes: Option<Json>,

    pub created_by: i32,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Region, location and sub-field (when present) joined into one label
    pub fn full_location(&self) -> String {
        let mut parts = vec![self.region.as_str(), self.location.as_str()];
        if let Some(sub) = self.sub_field.as_deref().filter(|s| !s.is_empty()) {
            parts.push(sub);
        }
        parts.join(LOCATION_SEPARATOR)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id"
    )]
    Creator,

    #[sea_orm(has_many = "super::record::Entity")]
    Records,
}

impl Related<super::record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

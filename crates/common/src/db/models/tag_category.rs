//! Tag category entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of grouping a category represents
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum TagCategoryType {
    #[sea_orm(string_value = "theme")]
    Theme,
    #[sea_orm(string_value = "content")]
    Content,
    #[sea_orm(string_value = "analysis")]
    Analysis,
}

/// Color assigned when a category is created without one
pub const DEFAULT_CATEGORY_COLOR: &str = "#2196F3";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag_categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub kind: TagCategoryType,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub color: Option<String>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::tag::Entity")]
    Tags,
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

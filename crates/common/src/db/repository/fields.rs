//! Field (research site) operations

use super::Repository;
use crate::access::Visibility;
use crate::auth::Principal;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::records::double_option;
use crate::records::pagination::{paginate, Page, PageWindow};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FieldInput {
    #[validate(length(min = 1, max = 100))]
    pub region: String,

    #[validate(length(min = 1, max = 200))]
    pub location: String,

    #[validate(length(max = 200))]
    pub sub_field: Option<String>,

    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,

    pub address: Option<String>,

    pub description: Option<Value>,

    pub time_attributes: Option<Value>,
}

/// Partial update; `null` clears optional attributes
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FieldPatch {
    #[validate(length(min = 1, max = 100))]
    pub region: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub sub_field: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub latitude: Option<Option<f64>>,

    #[serde(default, deserialize_with = "double_option")]
    pub longitude: Option<Option<f64>>,

    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<Value>>,

    #[serde(default, deserialize_with = "double_option")]
    pub time_attributes: Option<Option<Value>>,
}

impl FieldPatch {
    fn check(&self) -> Result<()> {
        self.validate()?;
        if let Some(Some(lat)) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(AppError::invalid_field("latitude", "latitude out of range"));
            }
        }
        if let Some(Some(lng)) = self.longitude {
            if !(-180.0..=180.0).contains(&lng) {
                return Err(AppError::invalid_field("longitude", "longitude out of range"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldListParams {
    pub region: Option<String>,
    /// Substring of location, sub-field or address
    pub search: Option<String>,
}

impl Repository {
    pub async fn list_fields(
        &self,
        principal: &Principal,
        params: &FieldListParams,
        window: PageWindow,
    ) -> Result<Page<Field>> {
        let mut cond = Visibility::scope(principal).condition::<FieldEntity>();
        if let Some(ref region) = params.region {
            cond = cond.add(FieldColumn::Region.eq(region.as_str()));
        }
        if let Some(ref search) = params.search {
            cond = cond.add(
                Condition::any()
                    .add(FieldColumn::Location.contains(search.as_str()))
                    .add(FieldColumn::SubField.contains(search.as_str()))
                    .add(FieldColumn::Address.contains(search.as_str())),
            );
        }

        let select = FieldEntity::find()
            .filter(cond)
            .order_by_asc(FieldColumn::Region)
            .order_by_asc(FieldColumn::Location)
            .order_by_asc(FieldColumn::Id);
        paginate(select, self.read_conn(), window).await
    }

    /// Distinct regions among the caller's visible fields, sorted
    pub async fn field_regions(&self, principal: &Principal) -> Result<Vec<String>> {
        FieldEntity::find()
            .select_only()
            .column(FieldColumn::Region)
            .distinct()
            .filter(Visibility::scope(principal).condition::<FieldEntity>())
            .order_by_asc(FieldColumn::Region)
            .into_tuple::<String>()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    pub async fn get_field(&self, principal: &Principal, id: i32) -> Result<Field> {
        find_visible(self.read_conn(), principal, id).await
    }

    pub async fn create_field(&self, principal: &Principal, input: FieldInput) -> Result<Field> {
        input.validate()?;

        let txn = self.begin().await?;
        let now = chrono::Utc::now();
        let field = FieldActiveModel {
            region: Set(input.region),
            location: Set(input.location),
            sub_field: Set(input.sub_field),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            address: Set(input.address),
            description: Set(input.description),
            time_attributes: Set(input.time_attributes),
            created_by: Set(principal.user_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(field_id = field.id, user_id = principal.user_id, "Field created");
        Ok(field)
    }

    pub async fn update_field(&self, principal: &Principal, id: i32, patch: FieldPatch) -> Result<Field> {
        patch.check()?;

        let txn = self.begin().await?;
        let current = find_visible(&txn, principal, id).await?;

        let mut active: FieldActiveModel = current.into();
        if let Some(region) = patch.region {
            active.region = Set(region);
        }
        if let Some(location) = patch.location {
            active.location = Set(location);
        }
        if let Some(sub_field) = patch.sub_field {
            active.sub_field = Set(sub_field);
        }
        if let Some(latitude) = patch.latitude {
            active.latitude = Set(latitude);
        }
        if let Some(longitude) = patch.longitude {
            active.longitude = Set(longitude);
        }
        if let Some(address) = patch.address {
            active.address = Set(address);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(time_attributes) = patch.time_attributes {
            active.time_attributes = Set(time_attributes);
        }
        active.updated_at = Set(chrono::Utc::now());

        let field = active.update(&txn).await?;
        txn.commit().await?;
        Ok(field)
    }

    /// Delete a field; records that referenced it keep existing without one
    pub async fn delete_field(&self, principal: &Principal, id: i32) -> Result<()> {
        let txn = self.begin().await?;
        let field = find_visible(&txn, principal, id).await?;

        let detached = RecordEntity::update_many()
            .col_expr(RecordColumn::FieldId, Expr::value(Option::<i32>::None))
            .filter(RecordColumn::FieldId.eq(id))
            .exec(&txn)
            .await?;
        FieldEntity::delete_by_id(field.id).exec(&txn).await?;
        txn.commit().await?;

        info!(
            field_id = id,
            user_id = principal.user_id,
            detached_records = detached.rows_affected,
            "Field deleted"
        );
        Ok(())
    }
}

async fn find_visible<C: ConnectionTrait>(conn: &C, principal: &Principal, id: i32) -> Result<Field> {
    let field = FieldEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("field", id))?;
    Visibility::scope(principal).ensure::<FieldEntity>(&field)?;
    Ok(field)
}

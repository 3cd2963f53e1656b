//! Field (research site) handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use fieldnotes_common::{
    auth::Principal,
    db::{models::Field, FieldInput, FieldListParams, FieldPatch},
    errors::Result,
    records::{Page, PageParams},
};
use serde::Serialize;

use crate::{extract::ApiQuery, AppState};

/// Field with its computed location label
#[derive(Serialize)]
pub struct FieldResponse {
    #[serde(flatten)]
    pub field: Field,
    pub full_location: String,
}

impl From<Field> for FieldResponse {
    fn from(field: Field) -> Self {
        Self {
            full_location: field.full_location(),
            field,
        }
    }
}

pub async fn list_fields(
    State(state): State<AppState>,
    principal: Principal,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(params): ApiQuery<FieldListParams>,
) -> Result<Json<Page<FieldResponse>>> {
    let window = page.window()?;
    let fields = state.repo().list_fields(&principal, &params, window).await?;
    Ok(Json(fields.map(FieldResponse::from)))
}

/// Distinct regions for filter dropdowns
pub async fn regions(State(state): State<AppState>, principal: Principal) -> Result<Json<Vec<String>>> {
    Ok(Json(state.repo().field_regions(&principal).await?))
}

pub async fn create_field(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<FieldInput>,
) -> Result<(StatusCode, Json<FieldResponse>)> {
    let field = state.repo().create_field(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(field.into())))
}

pub async fn get_field(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Json<FieldResponse>> {
    Ok(Json(state.repo().get_field(&principal, id).await?.into()))
}

pub async fn update_field(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(patch): Json<FieldPatch>,
) -> Result<Json<FieldResponse>> {
    Ok(Json(state.repo().update_field(&principal, id, patch).await?.into()))
}

pub async fn delete_field(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    state.repo().delete_field(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

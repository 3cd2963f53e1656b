//! Tag category and tag handlers
//!
//! Reads are open to every authenticated user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use fieldnotes_common::{
    auth::Principal,
    db::{
        models::{TagCategory, TagCategoryType},
        CategoryWithCount, TagCategoryInput, TagCategoryPatch, TagInput, TagListParams, TagPatch,
        TagView,
    },
    errors::Result,
    records::{Page, PageParams},
};
use serde::Deserialize;

use crate::{extract::ApiQuery, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct CategoryQuery {
    #[serde(rename = "type")]
    pub kind: Option<TagCategoryType>,
}

// ==================== Categories ====================

pub async fn list_categories(
    State(state): State<AppState>,
    _principal: Principal,
    ApiQuery(query): ApiQuery<CategoryQuery>,
) -> Result<Json<Vec<CategoryWithCount>>> {
    Ok(Json(state.repo().list_tag_categories(query.kind).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<TagCategoryInput>,
) -> Result<(StatusCode, Json<TagCategory>)> {
    let category = state.repo().create_tag_category(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn get_category(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i32>,
) -> Result<Json<CategoryWithCount>> {
    Ok(Json(state.repo().get_tag_category(id).await?))
}

pub async fn update_category(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(patch): Json<TagCategoryPatch>,
) -> Result<Json<TagCategory>> {
    Ok(Json(state.repo().update_tag_category(&principal, id, patch).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    state.repo().delete_tag_category(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ==================== Tags ====================

pub async fn list_tags(
    State(state): State<AppState>,
    _principal: Principal,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(params): ApiQuery<TagListParams>,
) -> Result<Json<Page<TagView>>> {
    let window = page.window()?;
    Ok(Json(state.repo().list_tags(&params, window).await?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<TagInput>,
) -> Result<(StatusCode, Json<TagView>)> {
    let tag = state.repo().create_tag(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn get_tag(
    State(state): State<AppState>,
    _principal: Principal,
    Path(id): Path<i32>,
) -> Result<Json<TagView>> {
    Ok(Json(state.repo().get_tag(id).await?))
}

pub async fn update_tag(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(patch): Json<TagPatch>,
) -> Result<Json<TagView>> {
    Ok(Json(state.repo().update_tag(&principal, id, patch).await?))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    state.repo().delete_tag(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

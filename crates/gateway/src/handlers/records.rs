//! Record handlers

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fieldnotes_common::{
    auth::Principal,
    db::models::RecordImage,
    errors::Result,
    metrics,
    records::{Page, PageParams, RecordFilter, RecordFilterParams, RecordInput, RecordPatch, RecordView},
};
use serde::Serialize;

use crate::{extract::ApiQuery, AppState, API_PREFIX};

/// Image metadata with its download URL
#[derive(Serialize)]
pub struct ImageResponse {
    #[serde(flatten)]
    pub image: RecordImage,
    pub url: String,
}

impl From<RecordImage> for ImageResponse {
    fn from(image: RecordImage) -> Self {
        Self {
            url: format!("{}{}", API_PREFIX, image.url()),
            image,
        }
    }
}

/// List records visible to the caller
///
/// Query: `skip`, `limit`, `type`, `status`, `search`, `created_by`,
/// `start_date`, `end_date`, `field_id`, `participant_ids`, `tag_ids`
pub async fn list_records(
    State(state): State<AppState>,
    principal: Principal,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(params): ApiQuery<RecordFilterParams>,
) -> Result<Json<Page<RecordView>>> {
    let window = page.window()?;
    let filter = RecordFilter::from_params(params)?;

    let page = state.repo().list_records(&principal, &filter, window).await?;
    metrics::record_listing(page.items.len(), filter.is_filtered());

    Ok(Json(page.map(RecordView::from)))
}

pub async fn create_record(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<RecordInput>,
) -> Result<(StatusCode, Json<RecordView>)> {
    let detail = state.repo().create_record(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(detail.into())))
}

pub async fn get_record(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Json<RecordView>> {
    let detail = state.repo().get_record(&principal, id).await?;
    Ok(Json(detail.into()))
}

/// Partial update; send `version` to make it conditional
pub async fn update_record(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(patch): Json<RecordPatch>,
) -> Result<Json<RecordView>> {
    let detail = state.repo().update_record(&principal, id, patch).await?;
    Ok(Json(detail.into()))
}

pub async fn delete_record(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    state
        .repo()
        .delete_record(&principal, id, state.blobs.as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_images(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ImageResponse>>> {
    let images = state.repo().list_record_images(&principal, id).await?;
    Ok(Json(images.into_iter().map(ImageResponse::from).collect()))
}

/// Stream an image's bytes
pub async fn image_file(
    State(state): State<AppState>,
    principal: Principal,
    Path((id, image_id)): Path<(i32, i32)>,
) -> Result<Response> {
    let image = state.repo().get_record_image(&principal, id, image_id).await?;
    let bytes = state.blobs.get(&image.file_path).await?;

    Ok(([(header::CONTENT_TYPE, image.mime_type)], bytes).into_response())
}

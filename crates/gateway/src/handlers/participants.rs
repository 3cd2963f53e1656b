//! Participant handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use fieldnotes_common::{
    auth::Principal,
    db::{models::Participant, ParticipantInput, ParticipantListParams, ParticipantPatch},
    errors::Result,
    records::{Page, PageParams},
};

use crate::{extract::ApiQuery, AppState};

pub async fn list_participants(
    State(state): State<AppState>,
    principal: Principal,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(params): ApiQuery<ParticipantListParams>,
) -> Result<Json<Page<Participant>>> {
    let window = page.window()?;
    Ok(Json(state.repo().list_participants(&principal, &params, window).await?))
}

pub async fn create_participant(
    State(state): State<AppState>,
    principal: Principal,
    Json(input): Json<ParticipantInput>,
) -> Result<(StatusCode, Json<Participant>)> {
    let participant = state.repo().create_participant(&principal, input).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn get_participant(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<Json<Participant>> {
    Ok(Json(state.repo().get_participant(&principal, id).await?))
}

pub async fn update_participant(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
    Json(patch): Json<ParticipantPatch>,
) -> Result<Json<Participant>> {
    Ok(Json(state.repo().update_participant(&principal, id, patch).await?))
}

pub async fn delete_participant(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    state.repo().delete_participant(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

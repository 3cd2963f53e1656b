//! User handlers

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use fieldnotes_common::{
    auth::Principal,
    db::{models::User, NewUser, UserListParams},
    errors::Result,
    records::{Page, PageParams},
};

use crate::{extract::ApiQuery, AppState};

/// The authenticated caller's account
pub async fn me(State(state): State<AppState>, principal: Principal) -> Result<Json<User>> {
    let user = state.repo().current_user(&principal).await?;
    Ok(Json(user))
}

/// List accounts (administrators only)
pub async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(params): ApiQuery<UserListParams>,
) -> Result<Json<Page<User>>> {
    let window = page.window()?;
    let users = state.repo().list_users(&principal, &params, window).await?;
    Ok(Json(users))
}

/// Provision an account (administrators only)
pub async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    Json(new_user): Json<NewUser>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.repo().create_user(&principal, new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

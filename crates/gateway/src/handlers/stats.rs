//! Dashboard statistics

use axum::{extract::State, Json};
use fieldnotes_common::{
    auth::Principal,
    db::{OverviewStats, RecentActivities, RecentActivityParams},
    errors::Result,
};

use crate::{extract::ApiQuery, AppState};

/// Counts of records, participants, fields and tags the caller can see
pub async fn overview(State(state): State<AppState>, principal: Principal) -> Result<Json<OverviewStats>> {
    Ok(Json(state.repo().overview_stats(&principal).await?))
}

/// Latest created records, participants and fields; `limit` is 1..=50
pub async fn recent_activities(
    State(state): State<AppState>,
    principal: Principal,
    ApiQuery(params): ApiQuery<RecentActivityParams>,
) -> Result<Json<RecentActivities>> {
    Ok(Json(state.repo().recent_activities(&principal, params).await?))
}

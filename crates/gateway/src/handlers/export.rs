//! Record export handlers

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use fieldnotes_common::{
    auth::Principal,
    errors::Result,
    export::{ExportFormat, ExportFormatter},
    metrics,
    records::{parse_record_ids, RecordFilter, RecordFilterParams},
};
use serde::Deserialize;
use std::time::Instant;

use crate::{extract::ApiQuery, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// Comma-separated record ids; every token must be an integer
    pub record_ids: Option<String>,
}

/// Download visible records as JSON, CSV or Markdown.
///
/// The list filters apply as well; `record_ids` narrows further. An empty
/// selection is a 404, a malformed id list a 400.
pub async fn export_records(
    State(state): State<AppState>,
    principal: Principal,
    Path(format): Path<String>,
    ApiQuery(query): ApiQuery<ExportQuery>,
    ApiQuery(params): ApiQuery<RecordFilterParams>,
) -> Result<Response> {
    let format: ExportFormat = format.parse()?;
    let record_ids = parse_record_ids(query.record_ids.as_deref())?;
    let filter = RecordFilter::from_params(params)?.with_record_ids(record_ids);

    let start = Instant::now();
    let records = state.repo().export_records(&principal, &filter).await?;
    let file = ExportFormatter::new(state.config.export.localized_filename_prefix.as_str())
        .render(format, &records)?;

    metrics::record_export(format.as_str(), file.record_count, start.elapsed().as_secs_f64());
    tracing::info!(
        user_id = principal.user_id,
        format = %format,
        records = file.record_count,
        filename = %file.filename,
        "Records exported"
    );

    let headers = [
        (header::CONTENT_TYPE, file.content_type().to_string()),
        (header::CONTENT_DISPOSITION, file.content_disposition()),
    ];
    Ok((headers, file.body).into_response())
}

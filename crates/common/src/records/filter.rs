//! Record filter builder
//!
//! Turns optional query criteria into one `Condition` over the `records`
//! table. Criteria are ANDed and each applies only when supplied.
//! Participant and tag criteria are `IN (subquery)` tests against the
//! junction tables rather than joins, so a record matching several
//! association rows still appears exactly once and counts stay exact.

use crate::access::Visibility;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Select};
use serde::Deserialize;

/// Raw filter criteria as they arrive in a query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordFilterParams {
    #[serde(rename = "type")]
    pub kind: Option<RecordType>,
    pub status: Option<RecordStatus>,
    pub search: Option<String>,
    pub created_by: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub field_id: Option<i32>,
    /// Comma-separated participant ids
    pub participant_ids: Option<String>,
    /// Comma-separated tag ids
    pub tag_ids: Option<String>,
}

/// Parsed, validated filter criteria
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub kind: Option<RecordType>,
    pub status: Option<RecordStatus>,
    pub created_by: Option<i32>,
    pub title_contains: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub field_id: Option<i32>,
    pub participant_ids: Option<Vec<i32>>,
    pub tag_ids: Option<Vec<i32>>,
    /// Explicit selection; an empty list selects nothing
    pub record_ids: Option<Vec<i32>>,
}

impl RecordFilter {
    /// Parse query-string criteria.
    ///
    /// Malformed dates are rejected. Malformed participant or tag id lists
    /// are dropped and the corresponding filter is not applied.
    pub fn from_params(params: RecordFilterParams) -> Result<Self> {
        Ok(Self {
            kind: params.kind,
            status: params.status,
            created_by: params.created_by,
            title_contains: params.search.filter(|s| !s.is_empty()),
            date_from: parse_optional_date("start_date", params.start_date.as_deref())?,
            date_to: parse_optional_date("end_date", params.end_date.as_deref())?,
            field_id: params.field_id,
            participant_ids: params.participant_ids.as_deref().and_then(parse_id_list_lenient),
            tag_ids: params.tag_ids.as_deref().and_then(parse_id_list_lenient),
            record_ids: None,
        })
    }

    /// Narrow to an explicit id selection
    pub fn with_record_ids(mut self, ids: Option<Vec<i32>>) -> Self {
        self.record_ids = ids;
        self
    }

    /// Whether any caller-supplied criterion is present
    pub fn is_filtered(&self) -> bool {
        *self != Self::default()
    }

    /// Combine the visibility scope and every supplied criterion
    pub fn condition(&self, visibility: Visibility) -> Condition {
        let mut cond = Condition::all().add(visibility.condition::<RecordEntity>());

        if let Some(kind) = self.kind {
            cond = cond.add(RecordColumn::Kind.eq(kind));
        }
        if let Some(status) = self.status {
            cond = cond.add(RecordColumn::Status.eq(status));
        }
        if let Some(created_by) = self.created_by {
            cond = cond.add(RecordColumn::CreatedBy.eq(created_by));
        }
        if let Some(ref needle) = self.title_contains {
            cond = cond.add(RecordColumn::Title.contains(needle.as_str()));
        }
        if let Some(from) = self.date_from {
            cond = cond.add(RecordColumn::RecordDate.gte(from));
        }
        if let Some(to) = self.date_to {
            cond = cond.add(RecordColumn::RecordDate.lte(to));
        }
        if let Some(field_id) = self.field_id {
            cond = cond.add(RecordColumn::FieldId.eq(field_id));
        }
        if let Some(ref ids) = self.participant_ids {
            cond = cond.add(
                RecordColumn::Id.in_subquery(
                    Query::select()
                        .column(RecordParticipantColumn::RecordId)
                        .from(RecordParticipantEntity)
                        .and_where(RecordParticipantColumn::ParticipantId.is_in(ids.iter().copied()))
                        .to_owned(),
                ),
            );
        }
        if let Some(ref ids) = self.tag_ids {
            cond = cond.add(
                RecordColumn::Id.in_subquery(
                    Query::select()
                        .column(RecordTagColumn::RecordId)
                        .from(RecordTagEntity)
                        .and_where(RecordTagColumn::TagId.is_in(ids.iter().copied()))
                        .to_owned(),
                ),
            );
        }
        if let Some(ref ids) = self.record_ids {
            cond = cond.add(RecordColumn::Id.is_in(ids.iter().copied()));
        }

        cond
    }

    /// Filtered select in the canonical order: newest event first, then id
    pub fn select(&self, visibility: Visibility) -> Select<RecordEntity> {
        RecordEntity::find()
            .filter(self.condition(visibility))
            .order_by_desc(RecordColumn::RecordDate)
            .order_by_asc(RecordColumn::Id)
    }
}

/// Split a comma-separated id list, skipping blank tokens
pub fn parse_id_list(raw: &str) -> std::result::Result<Vec<i32>, std::num::ParseIntError> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::parse::<i32>)
        .collect()
}

/// List-filter variant: any bad token discards the whole list, and an
/// empty list imposes no constraint
pub fn parse_id_list_lenient(raw: &str) -> Option<Vec<i32>> {
    parse_id_list(raw).ok().filter(|ids| !ids.is_empty())
}

/// Export/bulk-selection variant: any bad token is a client error.
///
/// A blank value means "no selection". A value made only of separators
/// yields an empty selection.
pub fn parse_record_ids(raw: Option<&str>) -> Result<Option<Vec<i32>>> {
    match raw {
        None => Ok(None),
        Some(raw) if raw.is_empty() => Ok(None),
        Some(raw) => parse_id_list(raw)
            .map(Some)
            .map_err(|_| AppError::InvalidFormat {
                message: format!("Invalid record id list: {}", raw),
            }),
    }
}

/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS` (taken as UTC) or `YYYY-MM-DD`
/// (midnight UTC)
pub fn parse_date_bound(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_optional_date(field: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_date_bound(raw)
            .map(Some)
            .ok_or_else(|| AppError::invalid_field(field, format!("Invalid date: {}", raw))),
    }
}

//! Field records: filtering, pagination, associations and typed content

pub mod associations;
pub mod content;
pub mod filter;
pub mod pagination;

pub use associations::LoadedAssociations;
pub use content::RecordContent;
pub use filter::{parse_record_ids, RecordFilter, RecordFilterParams};
pub use pagination::{Page, PageParams, PageWindow};

use crate::db::models::*;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

/// New record
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(rename = "type")]
    pub kind: RecordType,

    pub record_date: DateTime<Utc>,

    #[validate(length(max = 50))]
    pub time_range: Option<String>,

    #[validate(range(min = 0))]
    pub duration: Option<i32>,

    pub field_id: Option<i32>,

    pub specific_location: Option<String>,

    #[serde(default = "content::empty_content")]
    pub content: Value,

    #[serde(default)]
    pub status: RecordStatus,

    #[serde(default)]
    pub participant_ids: Vec<i32>,

    #[serde(default)]
    pub tag_ids: Vec<i32>,
}

/// Partial update; absent fields are left untouched.
///
/// Nullable columns use `Option<Option<_>>`: absent leaves the value,
/// explicit `null` clears it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct RecordPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<RecordType>,

    pub record_date: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "double_option")]
    pub time_range: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub duration: Option<Option<i32>>,

    #[serde(default, deserialize_with = "double_option")]
    pub field_id: Option<Option<i32>>,

    #[serde(default, deserialize_with = "double_option")]
    pub specific_location: Option<Option<String>>,

    pub content: Option<Value>,

    pub status: Option<RecordStatus>,

    /// Replaces the whole participant set when present
    pub participant_ids: Option<Vec<i32>>,

    /// Replaces the whole tag set when present
    pub tag_ids: Option<Vec<i32>>,

    /// Expected current version; mismatch is a conflict
    pub version: Option<i32>,
}

impl RecordPatch {
    /// Checks the derive cannot express on doubly-optional fields
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        if let Some(Some(ref range)) = self.time_range {
            if range.chars().count() > record::TIME_RANGE_MAX_LEN {
                return Err(AppError::invalid_field("time_range", "time_range is too long"));
            }
        }
        if let Some(Some(duration)) = self.duration {
            if duration < 0 {
                return Err(AppError::invalid_field("duration", "duration must be >= 0"));
            }
        }
        Ok(())
    }
}

/// Deserialize a present field (including `null`) as `Some(_)`
pub fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Record with its field, participants and tags loaded
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDetail {
    pub record: Record,
    pub field: Option<Field>,
    pub participants: Vec<Participant>,
    pub tags: Vec<Tag>,
}

impl RecordDetail {
    /// Attach batch-loaded associations to each record, keeping order
    pub fn assemble(records: Vec<Record>, mut loaded: LoadedAssociations) -> Vec<RecordDetail> {
        records
            .into_iter()
            .map(|record| RecordDetail {
                field: record.field_id.and_then(|id| loaded.fields.get(&id).cloned()),
                participants: loaded.participants.remove(&record.id).unwrap_or_default(),
                tags: loaded.tags.remove(&record.id).unwrap_or_default(),
                record,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldBrief {
    pub id: i32,
    pub region: String,
    pub location: String,
    pub sub_field: Option<String>,
    pub full_location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantBrief {
    pub id: i32,
    pub name_or_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagBrief {
    pub id: i32,
    pub name: String,
    pub category_id: i32,
}

/// API shape of a record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordView {
    #[serde(flatten)]
    pub record: Record,
    pub field: Option<FieldBrief>,
    pub participants: Vec<ParticipantBrief>,
    pub tags: Vec<TagBrief>,
}

impl From<RecordDetail> for RecordView {
    fn from(detail: RecordDetail) -> Self {
        RecordView {
            field: detail.field.map(|f| FieldBrief {
                full_location: f.full_location(),
                id: f.id,
                region: f.region,
                location: f.location,
                sub_field: f.sub_field,
            }),
            participants: detail
                .participants
                .into_iter()
                .map(|p| ParticipantBrief {
                    id: p.id,
                    name_or_code: p.name_or_code,
                })
                .collect(),
            tags: detail
                .tags
                .into_iter()
                .map(|t| TagBrief {
                    id: t.id,
                    name: t.name,
                    category_id: t.category_id,
                })
                .collect(),
            record: detail.record,
        }
    }
}

//! Record export
//!
//! Records are first flattened into [`ExportRow`]s by [`normalize`], then
//! rendered as JSON, CSV or Markdown. Every renderer refuses an empty
//! input with [`AppError::NoData`].

mod csv;
mod json;
mod markdown;

use crate::db::models::Field;
use crate::errors::{AppError, Result};
use crate::records::RecordDetail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// ASCII filename stem
pub const FILENAME_PREFIX: &str = "field_records_export";

/// Format for record dates and audit timestamps
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Format for the export timestamp
pub const EXPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Content keys summarized in exports, in output order, with their labels
pub const SUMMARY_KEYS: [(&str, &str); 3] = [
    ("description", "Description"),
    ("reflection", "Reflection"),
    ("notes", "Notes"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "markdown",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            other => Err(AppError::InvalidFormat {
                message: format!("Unsupported export format: {}", other),
            }),
        }
    }
}

/// One record flattened for export
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExportRow {
    pub id: i32,
    pub title: String,
    /// Human-readable type label
    #[serde(rename = "type")]
    pub type_label: String,
    pub type_value: String,
    pub record_date: String,
    pub time_range: String,
    pub duration: i32,
    pub field: String,
    pub participants: String,
    pub tags: String,
    /// Flattened content summary
    pub content: String,
    /// Content exactly as stored
    pub content_raw: Value,
    /// Human-readable status label
    pub status: String,
    pub status_value: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Flatten a record with its associations
pub fn normalize(detail: &RecordDetail) -> ExportRow {
    let record = &detail.record;

    ExportRow {
        id: record.id,
        title: record.title.clone(),
        type_label: record.kind.label().to_string(),
        type_value: record.kind.as_str().to_string(),
        record_date: record.record_date.format(DATE_FORMAT).to_string(),
        time_range: record.time_range.clone().unwrap_or_default(),
        duration: record.duration.unwrap_or(0),
        field: field_label(detail.field.as_ref(), record.specific_location.as_deref()),
        participants: detail
            .participants
            .iter()
            .map(|p| p.name_or_code.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        tags: detail
            .tags
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        content: content_summary(&record.content),
        content_raw: record.content.clone(),
        status: record.status.label().to_string(),
        status_value: record.status.as_str().to_string(),
        created_at: record.created_at.format(DATE_FORMAT).to_string(),
        updated_at: record.updated_at.format(DATE_FORMAT).to_string(),
    }
}

/// `region - location[ - sub_field]`, then ` (specific location)` if any
pub fn field_label(field: Option<&Field>, specific_location: Option<&str>) -> String {
    let base = field.map(Field::full_location).unwrap_or_default();
    match specific_location.filter(|s| !s.is_empty()) {
        Some(spot) if base.is_empty() => spot.to_string(),
        Some(spot) => format!("{} ({})", base, spot),
        None => base,
    }
}

/// Labelled description/reflection/notes lines, or compact JSON when the
/// payload has none of them
pub fn content_summary(content: &Value) -> String {
    let mut text = String::new();
    if let Value::Object(map) = content {
        for (key, label) in SUMMARY_KEYS {
            if let Some(value) = map.get(key).and_then(summary_text) {
                text.push_str(label);
                text.push_str(": ");
                text.push_str(&value);
                text.push('\n');
            }
        }
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        content.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Text of a summary value; `None` for empty or falsy values, zero included
pub(crate) fn summary_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(a) if a.is_empty() => None,
        Value::Object(o) if o.is_empty() => None,
        other => Some(other.to_string()),
    }
}

/// Rendered export ready to be sent as an attachment
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub format: ExportFormat,
    pub filename: String,
    pub localized_filename: String,
    pub record_count: usize,
    pub body: Vec<u8>,
}

impl ExportFile {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// `attachment` with an ASCII filename and an RFC 5987 UTF-8 variant
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            self.filename,
            urlencoding::encode(&self.localized_filename)
        )
    }
}

/// Renders record sets at a fixed export time
#[derive(Debug, Clone)]
pub struct ExportFormatter {
    exported_at: DateTime<Utc>,
    localized_prefix: String,
}

impl ExportFormatter {
    /// Formatter stamped with the current time
    pub fn new(localized_prefix: impl Into<String>) -> Self {
        Self::at(Utc::now(), localized_prefix)
    }

    pub fn at(exported_at: DateTime<Utc>, localized_prefix: impl Into<String>) -> Self {
        Self {
            exported_at,
            localized_prefix: localized_prefix.into(),
        }
    }

    pub fn exported_at(&self) -> DateTime<Utc> {
        self.exported_at
    }

    /// Render `records` in the given format
    pub fn render(&self, format: ExportFormat, records: &[RecordDetail]) -> Result<ExportFile> {
        if records.is_empty() {
            return Err(AppError::NoData);
        }

        let rows: Vec<ExportRow> = records.iter().map(normalize).collect();
        let export_time = self.exported_at.format(EXPORT_TIME_FORMAT).to_string();

        let body = match format {
            ExportFormat::Json => json::render(&rows, &export_time)?,
            ExportFormat::Csv => csv::render(&rows).into_bytes(),
            ExportFormat::Markdown => markdown::render(&rows, &export_time).into_bytes(),
        };

        let stamp = self.exported_at.format("%Y%m%d_%H%M%S");
        Ok(ExportFile {
            format,
            filename: format!("{}_{}.{}", FILENAME_PREFIX, stamp, format.extension()),
            localized_filename: format!("{}_{}.{}", self.localized_prefix, stamp, format.extension()),
            record_count: rows.len(),
            body,
        })
    }
}

//! Typed record content
//!
//! The stored payload is an open JSON object. On write it must also read as
//! the variant for the record's type; unknown keys land in `extra` and are
//! kept as-is.

use crate::db::models::RecordType;
use crate::errors::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldNoteContent {
    pub description: Option<String>,
    pub reflection: Option<String>,
    pub notes: Option<String>,
    pub theoretical_notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterviewContent {
    pub interview_outline: Option<String>,
    /// Question/answer pairs, e.g. `{"question": ..., "answer": ...}`
    #[serde(default)]
    pub qa_records: Vec<BTreeMap<String, String>>,
    pub researcher_notes: Option<String>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationContent {
    pub scene_description: Option<String>,
    #[serde(default)]
    pub behavior_records: Vec<Map<String, Value>>,
    pub environment_notes: Option<String>,
    pub researcher_reflection: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Content keyed by record type
#[derive(Debug, Clone, PartialEq)]
pub enum RecordContent {
    FieldNote(FieldNoteContent),
    Interview(InterviewContent),
    Observation(ObservationContent),
    Other(Map<String, Value>),
}

impl RecordContent {
    /// Type-check a raw payload against the variant for `kind`
    pub fn parse(kind: RecordType, raw: &Value) -> Result<Self> {
        let object = raw
            .as_object()
            .ok_or_else(|| AppError::invalid_field("content", "content must be a JSON object"))?
            .clone();

        let parsed = match kind {
            RecordType::FieldNote => from_object(object).map(RecordContent::FieldNote),
            RecordType::Interview => from_object(object).map(RecordContent::Interview),
            RecordType::Observation => from_object(object).map(RecordContent::Observation),
            RecordType::Other => Ok(RecordContent::Other(object)),
        };

        parsed.map_err(|e| {
            AppError::invalid_field(
                "content",
                format!("content does not match type {}: {}", kind.as_str(), e),
            )
        })
    }

    pub fn kind(&self) -> RecordType {
        match self {
            RecordContent::FieldNote(_) => RecordType::FieldNote,
            RecordContent::Interview(_) => RecordType::Interview,
            RecordContent::Observation(_) => RecordType::Observation,
            RecordContent::Other(_) => RecordType::Other,
        }
    }
}

fn from_object<T: serde::de::DeserializeOwned>(
    object: Map<String, Value>,
) -> std::result::Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(object))
}

/// Default payload for records created without content
pub fn empty_content() -> Value {
    Value::Object(Map::new())
}

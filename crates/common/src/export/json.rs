//! Structured-data export

use super::ExportRow;
use crate::errors::Result;
use serde::Serialize;

#[derive(Serialize)]
struct JsonExport<'a> {
    export_time: &'a str,
    total_count: usize,
    records: &'a [ExportRow],
}

/// Pretty-printed `{export_time, total_count, records}`
pub(super) fn render(rows: &[ExportRow], export_time: &str) -> Result<Vec<u8>> {
    let doc = JsonExport {
        export_time,
        total_count: rows.len(),
        records: rows,
    };
    Ok(serde_json::to_vec_pretty(&doc)?)
}

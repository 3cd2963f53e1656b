//! Delimited-text export
//!
//! Output starts with a UTF-8 byte-order mark so spreadsheet tools detect
//! the encoding. Text cells are always quoted, embedded quotes doubled and
//! line breaks flattened to a single space; numeric cells are bare.

use super::ExportRow;

const BOM: char = '\u{feff}';

pub const HEADER: [&str; 13] = [
    "ID",
    "Title",
    "Type",
    "Record date",
    "Time range",
    "Duration (min)",
    "Field",
    "Participants",
    "Tags",
    "Content",
    "Status",
    "Created at",
    "Updated at",
];

/// Quote a text cell
fn quote(value: &str) -> String {
    let flattened = value
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .replace('"', "\"\"");
    format!("\"{}\"", flattened)
}

fn row(r: &ExportRow) -> String {
    [
        r.id.to_string(),
        quote(&r.title),
        quote(&r.type_label),
        quote(&r.record_date),
        quote(&r.time_range),
        r.duration.to_string(),
        quote(&r.field),
        quote(&r.participants),
        quote(&r.tags),
        quote(&r.content),
        quote(&r.status),
        quote(&r.created_at),
        quote(&r.updated_at),
    ]
    .join(",")
}

pub(super) fn render(rows: &[ExportRow]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format!("{}{}", BOM, HEADER.join(",")));
    lines.extend(rows.iter().map(row));
    lines.join("\n")
}

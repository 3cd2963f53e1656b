//! Document-markup export

use super::{ExportRow, SUMMARY_KEYS};
use serde_json::Value;

pub const TITLE: &str = "Field Records Export";

/// Table cells cannot hold pipes or line breaks
fn cell(value: &str) -> String {
    if value.is_empty() {
        return "-".to_string();
    }
    value
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace(['\r', '\n'], "<br>")
}

fn push_record(lines: &mut Vec<String>, row: &ExportRow) {
    let duration = if row.duration != 0 {
        format!("{} min", row.duration)
    } else {
        "-".to_string()
    };

    lines.push(format!("## {}", row.title));
    lines.push(String::new());
    lines.push("| Attribute | Value |".to_string());
    lines.push("|------|-----|".to_string());
    lines.push(format!("| Type | {} |", cell(&row.type_label)));
    lines.push(format!("| Record date | {} |", cell(&row.record_date)));
    lines.push(format!("| Time range | {} |", cell(&row.time_range)));
    lines.push(format!("| Duration | {} |", duration));
    lines.push(format!("| Field | {} |", cell(&row.field)));
    lines.push(format!("| Participants | {} |", cell(&row.participants)));
    lines.push(format!("| Tags | {} |", cell(&row.tags)));
    lines.push(format!("| Status | {} |", cell(&row.status)));
    lines.push(String::new());

    // Raw text, verbatim, for the recognized keys only
    if let Value::Object(ref content) = row.content_raw {
        for (key, label) in SUMMARY_KEYS {
            if let Some(text) = content.get(key).and_then(super::summary_text) {
                lines.push(format!("### {}", label));
                lines.push(String::new());
                lines.push(text);
                lines.push(String::new());
            }
        }
    }

    lines.push("---".to_string());
    lines.push(String::new());
}

pub(super) fn render(rows: &[ExportRow], export_time: &str) -> String {
    let mut lines = vec![
        format!("# {}", TITLE),
        String::new(),
        format!("Export time: {}", export_time),
        String::new(),
        format!("{} records total", rows.len()),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    for row in rows {
        push_record(&mut lines, row);
    }

    lines.join("\n")
}

//! # Response Rendering
//!
//! The two wire formats a grid view answers with: the JSON page envelope
//! and the CSV export.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;

use super::projector::ProjectedRow;

/// Timestamp embedded in export file names
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// JSON page envelope
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    #[serde(rename = "recordsTotal")]
    pub records_total: usize,
    #[serde(rename = "recordsFiltered")]
    pub records_filtered: usize,
    pub draw: i64,
    pub data: Vec<ProjectedRow>,
}

impl PageResponse {
    /// `draw` is echoed as an integer; a token that is not one renders as 0
    pub fn new(records_total: usize, records_filtered: usize, draw: &str, data: Vec<ProjectedRow>) -> Self {
        Self {
            records_total,
            records_filtered,
            draw: draw.trim().parse().unwrap_or(0),
            data,
        }
    }
}

/// Rendered outcome of one grid request
#[derive(Debug, Clone)]
pub enum GridResponse {
    Page(PageResponse),
    Export { filename: String, body: String },
}

impl IntoResponse for GridResponse {
    fn into_response(self) -> Response {
        match self {
            GridResponse::Page(page) => Json(page).into_response(),
            GridResponse::Export { filename, body } => (
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", filename),
                    ),
                ],
                body,
            )
                .into_response(),
        }
    }
}

/// `<resource>_<timestamp>.csv`
pub fn export_filename(resource: &str, at: NaiveDateTime) -> String {
    format!("{}_{}.csv", resource, at.format(EXPORT_TIMESTAMP_FORMAT))
}

/// Render rows as CSV.
///
/// The header comes from `headers` when given (written even when there are
/// no rows), otherwise from the first row's keys.
pub fn render_csv(rows: &[ProjectedRow], headers: Option<&[String]>) -> String {
    let mut out = String::new();

    match headers {
        Some(headers) => write_record(&mut out, headers.iter().map(String::as_str)),
        None => {
            if let Some(first) = rows.first() {
                write_record(&mut out, first.keys());
            }
        }
    }

    for row in rows {
        let cells: Vec<String> = row.values().map(cell_text).collect();
        write_record(&mut out, cells.iter().map(String::as_str));
    }

    out
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_record<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_cell(out, cell);
    }
    out.push_str("\r\n");
}

// RFC 4180: quote cells holding a delimiter, quote or line break
fn write_cell(out: &mut String, cell: &str) {
    if cell.contains([',', '"', '\r', '\n']) {
        out.push('"');
        out.push_str(&cell.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(cell);
    }
}

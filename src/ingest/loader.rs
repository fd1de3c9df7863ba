//! Format-specific text extraction
//!
//! Dispatches on file extension and produces plain text ready for chunking.
//! Parse failures and unsupported formats yield an empty extraction (logged,
//! never raised) so the caller archives the file instead of retrying bad
//! content forever; only genuine read failures surface as I/O errors, which
//! leave the file in place for retry.

use std::path::Path;

use lopdf::{Document as PdfDocument, Object};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::{AppError, Result};

/// Source format of an ingested document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pdf,
    Csv,
    Json,
    Jsonl,
    Text,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Text => "text",
        }
    }
}

/// Plain text extracted from a document, tagged with its source format
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub text: String,
    pub kind: SourceKind,
}

/// Extract plain text from a file based on its extension.
///
/// Returns `Ok(None)` for unsupported extensions, empty content, and parse
/// failures (all logged); returns `Err` only for read failures worth
/// retrying.
pub fn load_document(path: &Path) -> Result<Option<ExtractedText>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => load_pdf(path),
        "csv" => load_csv(path),
        "json" | "jsonl" => load_json(path),
        "txt" | "md" => load_txt(path),
        _ => {
            warn!("Unsupported file format: {:?}", path);
            Ok(None)
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn non_empty(text: String, kind: SourceKind, path: &Path) -> Option<ExtractedText> {
    if text.trim().is_empty() {
        warn!("Skipping empty or unreadable {}: {}", kind.as_str(), file_name_of(path));
        None
    } else {
        Some(ExtractedText { text, kind })
    }
}

/// Concatenate per-page extracted text with blank-line separators.
fn load_pdf(path: &Path) -> Result<Option<ExtractedText>> {
    let doc = match PdfDocument::load(path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Error processing PDF '{}': {}", file_name_of(path), e);
            return Ok(None);
        }
    };

    let mut pages = Vec::new();
    for page_id in doc.get_pages().values() {
        let page_text = match extract_pdf_page(&doc, *page_id) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Error decoding page of PDF '{}': {}",
                    file_name_of(path),
                    e
                );
                continue;
            }
        };
        if !page_text.trim().is_empty() {
            pages.push(page_text.trim().to_string());
        }
    }

    Ok(non_empty(pages.join("\n\n"), SourceKind::Pdf, path))
}

/// Text shown by `Tj`/`TJ` operators on a single page.
fn extract_pdf_page(doc: &PdfDocument, page_id: (u32, u16)) -> anyhow::Result<String> {
    let content_data = doc.get_page_content(page_id)?;
    let content = lopdf::content::Content::decode(&content_data)?;

    let mut out = String::new();
    for operation in content.operations {
        if operation.operator == "Tj" || operation.operator == "TJ" {
            for operand in operation.operands {
                push_pdf_text(&operand, &mut out);
            }
        }
    }
    Ok(out)
}

fn push_pdf_text(object: &Object, out: &mut String) {
    match object {
        Object::String(bytes, _) => {
            if let Ok(text) = std::str::from_utf8(bytes) {
                out.push_str(text);
                out.push('\n');
            }
        }
        // TJ carries an array interleaving strings with kerning numbers
        Object::Array(items) => {
            for item in items {
                push_pdf_text(item, out);
            }
        }
        _ => {}
    }
}

/// Render the CSV as a column-aligned flat table string.
fn load_csv(path: &Path) -> Result<Option<ExtractedText>> {
    let mut reader = match csv::Reader::from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            return match e.kind() {
                csv::ErrorKind::Io(_) => Err(AppError::IoFailure {
                    path: path.display().to_string(),
                    details: e.to_string(),
                }),
                _ => {
                    warn!("Error processing CSV '{}': {}", file_name_of(path), e);
                    Ok(None)
                }
            };
        }
    };

    let headers: Vec<String> = match reader.headers() {
        Ok(headers) => headers.iter().map(str::to_string).collect(),
        Err(e) => {
            warn!("Error processing CSV '{}': {}", file_name_of(path), e);
            return Ok(None);
        }
    };

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => {
                warn!("Error processing CSV '{}': {}", file_name_of(path), e);
                return Ok(None);
            }
        }
    }

    if rows.is_empty() {
        warn!("Skipping empty CSV: {}", file_name_of(path));
        return Ok(None);
    }

    Ok(non_empty(render_table(&headers, &rows), SourceKind::Csv, path))
}

/// Right-aligned columns padded to the widest cell, one row per line.
fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let columns = headers.len();
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(columns) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .enumerate()
            .take(columns)
            .map(|(i, cell)| format!("{cell:>width$}", width = widths[i]))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut lines = vec![format_row(headers)];
    lines.extend(rows.iter().map(|row| format_row(row)));
    lines.join("\n")
}

/// Parse JSON, falling back to line-delimited objects, and re-serialize as
/// indented text.
fn load_json(path: &Path) -> Result<Option<ExtractedText>> {
    let raw = std::fs::read_to_string(path).map_err(|e| AppError::IoFailure {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;

    let data: Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(_) => {
            // Fall back to one JSON object per line
            let mut items = Vec::new();
            for line in raw.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<Value>(line) {
                    Ok(value) => items.push(value),
                    Err(e) => {
                        warn!("Error processing JSON '{}': {}", file_name_of(path), e);
                        return Ok(None);
                    }
                }
            }
            Value::Array(items)
        }
    };

    let is_empty = match &data {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    if is_empty {
        warn!("Skipping empty JSON: {}", file_name_of(path));
        return Ok(None);
    }

    let kind = if data.is_array() {
        SourceKind::Jsonl
    } else {
        SourceKind::Json
    };
    let text = serde_json::to_string_pretty(&data).map_err(|e| AppError::ParseFailure {
        file: file_name_of(path),
        details: e.to_string(),
    })?;

    Ok(non_empty(text, kind, path))
}

/// Read TXT/Markdown content as-is.
fn load_txt(path: &Path) -> Result<Option<ExtractedText>> {
    let text = std::fs::read_to_string(path).map_err(|e| AppError::IoFailure {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;
    Ok(non_empty(text.trim().to_string(), SourceKind::Text, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).expect("write test file");
        path
    }

    #[test]
    fn test_txt_loads_as_is() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "notes.txt", "  A short note.  \n");

        let extracted = load_document(&path).expect("load").expect("some text");
        assert_eq!(extracted.kind, SourceKind::Text);
        assert_eq!(extracted.text, "A short note.");
    }

    #[test]
    fn test_md_maps_to_text_kind() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "readme.md", "# Title\n\nBody.");

        let extracted = load_document(&path).expect("load").expect("some text");
        assert_eq!(extracted.kind, SourceKind::Text);
    }

    #[test]
    fn test_empty_txt_yields_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "blank.txt", "   \n\t  ");

        assert!(load_document(&path).expect("load").is_none());
    }

    #[test]
    fn test_unsupported_extension_yields_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "image.png", "not really a png");

        assert!(load_document(&path).expect("load").is_none());
    }

    #[test]
    fn test_json_whole_document() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "config.json", r#"{"name": "test", "count": 3}"#);

        let extracted = load_document(&path).expect("load").expect("some text");
        assert_eq!(extracted.kind, SourceKind::Json);
        assert!(extracted.text.contains("\"name\""));
    }

    #[test]
    fn test_json_array_reports_jsonl_kind() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "items.json", r#"[{"a": 1}, {"a": 2}]"#);

        let extracted = load_document(&path).expect("load").expect("some text");
        assert_eq!(extracted.kind, SourceKind::Jsonl);
    }

    #[test]
    fn test_jsonl_line_fallback() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "events.jsonl", "{\"a\": 1}\n{\"a\": 2}\n");

        let extracted = load_document(&path).expect("load").expect("some text");
        assert_eq!(extracted.kind, SourceKind::Jsonl);
        assert!(extracted.text.contains("\"a\": 2"));
    }

    #[test]
    fn test_malformed_json_yields_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "broken.json", "{not json at all");

        assert!(load_document(&path).expect("load").is_none());
    }

    #[test]
    fn test_csv_renders_flat_table() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "table.csv", "name,qty\nwidget,2\ngadget,10\n");

        let extracted = load_document(&path).expect("load").expect("some text");
        assert_eq!(extracted.kind, SourceKind::Csv);
        let lines: Vec<&str> = extracted.text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("name"));
        assert!(lines[2].contains("gadget"));
    }

    #[test]
    fn test_csv_with_only_headers_yields_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "empty.csv", "name,qty\n");

        assert!(load_document(&path).expect("load").is_none());
    }

    #[test]
    fn test_corrupt_pdf_yields_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = write_file(&dir, "broken.pdf", "%PDF-1.4 garbage");

        assert!(load_document(&path).expect("load").is_none());
    }

    #[test]
    fn test_missing_txt_is_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("never.txt");

        let err = load_document(&path).expect_err("should be io error");
        assert_eq!(err.code(), "IO_FAILURE");
    }
}
